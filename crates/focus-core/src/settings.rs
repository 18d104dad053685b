//! User-adjustable coordinator settings.
//!
//! [`Settings`] is the snapshot persisted alongside the rest of the coordinator
//! state. It only changes through [`Settings::apply`], which merges a
//! [`SettingsPatch`] received from the `update-settings` command.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

// ── PrivacyLevel ───────────────────────────────────────────────────────────────

/// How aggressively focus mode protects the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrivacyLevel {
    #[default]
    Standard,
    /// Focus mode ends automatically when the meeting timer runs out.
    Strict,
    Custom,
}

// ── Settings ───────────────────────────────────────────────────────────────────

/// Persisted coordinator settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub auto_detect_meetings: bool,
    pub calendar_integration: bool,
    pub hide_notifications: bool,
    pub clean_urls: bool,
    pub meeting_reminders: bool,
    pub action_extraction: bool,
    pub privacy_level: PrivacyLevel,
    /// Extra work domains, added to the built-in list.
    pub whitelist_domains: BTreeSet<String>,
    /// Extra personal domains, added to the built-in list.
    pub blacklist_domains: BTreeSet<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            auto_detect_meetings: true,
            calendar_integration: false,
            hide_notifications: true,
            clean_urls: true,
            meeting_reminders: true,
            action_extraction: true,
            privacy_level: PrivacyLevel::Standard,
            whitelist_domains: BTreeSet::new(),
            blacklist_domains: BTreeSet::new(),
        }
    }
}

/// What changed as the result of [`Settings::apply`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SettingsChange {
    pub hide_notifications: bool,
    pub domain_lists: bool,
}

impl Settings {
    /// Merge `patch` into these settings. Fields absent from the patch keep
    /// their current value; domain lists are replaced wholesale when present.
    pub fn apply(&mut self, patch: SettingsPatch) -> SettingsChange {
        let mut change = SettingsChange::default();

        if let Some(v) = patch.auto_detect_meetings {
            self.auto_detect_meetings = v;
        }
        if let Some(v) = patch.calendar_integration {
            self.calendar_integration = v;
        }
        if let Some(v) = patch.hide_notifications {
            change.hide_notifications = v != self.hide_notifications;
            self.hide_notifications = v;
        }
        if let Some(v) = patch.clean_urls {
            self.clean_urls = v;
        }
        if let Some(v) = patch.meeting_reminders {
            self.meeting_reminders = v;
        }
        if let Some(v) = patch.action_extraction {
            self.action_extraction = v;
        }
        if let Some(v) = patch.privacy_level {
            self.privacy_level = v;
        }
        if let Some(list) = patch.whitelist_domains {
            let list = normalise_domains(list);
            change.domain_lists |= list != self.whitelist_domains;
            self.whitelist_domains = list;
        }
        if let Some(list) = patch.blacklist_domains {
            let list = normalise_domains(list);
            change.domain_lists |= list != self.blacklist_domains;
            self.blacklist_domains = list;
        }

        change
    }
}

// ── SettingsPatch ──────────────────────────────────────────────────────────────

/// Partial settings object carried by `update-settings`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SettingsPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_detect_meetings: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calendar_integration: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hide_notifications: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clean_urls: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meeting_reminders: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action_extraction: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub privacy_level: Option<PrivacyLevel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub whitelist_domains: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blacklist_domains: Option<Vec<String>>,
}

/// Lowercase, trim and drop empty entries (and any leading `*.` / `.`).
fn normalise_domains(list: Vec<String>) -> BTreeSet<String> {
    list.into_iter()
        .map(|d| {
            d.trim()
                .trim_start_matches("*.")
                .trim_start_matches('.')
                .to_ascii_lowercase()
        })
        .filter(|d| !d.is_empty())
        .collect()
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let s = Settings::default();
        assert!(s.auto_detect_meetings);
        assert!(!s.calendar_integration);
        assert!(s.hide_notifications);
        assert!(s.clean_urls);
        assert!(s.meeting_reminders);
        assert!(s.action_extraction);
        assert_eq!(s.privacy_level, PrivacyLevel::Standard);
        assert!(s.whitelist_domains.is_empty());
        assert!(s.blacklist_domains.is_empty());
    }

    #[test]
    fn test_missing_fields_fall_back_to_defaults() {
        let s: Settings = serde_json::from_str(r#"{"calendarIntegration": true}"#).unwrap();
        assert!(s.calendar_integration);
        assert!(s.hide_notifications);
        assert_eq!(s.privacy_level, PrivacyLevel::Standard);
    }

    #[test]
    fn test_apply_partial_patch_keeps_other_fields() {
        let mut s = Settings::default();
        let patch: SettingsPatch =
            serde_json::from_str(r#"{"privacyLevel": "strict", "cleanUrls": false}"#).unwrap();

        let change = s.apply(patch);

        assert_eq!(s.privacy_level, PrivacyLevel::Strict);
        assert!(!s.clean_urls);
        assert!(s.hide_notifications);
        assert!(!change.hide_notifications);
        assert!(!change.domain_lists);
    }

    #[test]
    fn test_apply_reports_hide_notifications_change() {
        let mut s = Settings::default();
        let change = s.apply(SettingsPatch {
            hide_notifications: Some(false),
            ..Default::default()
        });
        assert!(change.hide_notifications);
        assert!(!s.hide_notifications);

        // Same value again is not a change.
        let change = s.apply(SettingsPatch {
            hide_notifications: Some(false),
            ..Default::default()
        });
        assert!(!change.hide_notifications);
    }

    #[test]
    fn test_apply_normalises_domain_lists() {
        let mut s = Settings::default();
        let change = s.apply(SettingsPatch {
            blacklist_domains: Some(vec![
                " News.Example.com ".to_string(),
                "*.games.io".to_string(),
                "".to_string(),
            ]),
            ..Default::default()
        });

        assert!(change.domain_lists);
        let list: Vec<&str> = s.blacklist_domains.iter().map(String::as_str).collect();
        assert_eq!(list, vec!["games.io", "news.example.com"]);
    }

    #[test]
    fn test_privacy_level_wire_names() {
        assert_eq!(
            serde_json::to_string(&PrivacyLevel::Strict).unwrap(),
            "\"strict\""
        );
        let level: PrivacyLevel = serde_json::from_str("\"custom\"").unwrap();
        assert_eq!(level, PrivacyLevel::Custom);
    }
}
