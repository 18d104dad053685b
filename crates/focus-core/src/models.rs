use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::settings::Settings;

/// Maximum number of action items kept from a single extraction.
pub const MAX_ACTION_ITEMS: usize = 10;

static NEXT_MEETING_SEQ: AtomicU64 = AtomicU64::new(1);

/// Identifier the resource manager assigns to an open resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(pub u64);

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An externally managed open document, as reported by the resource manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    pub id: ResourceId,
    pub url: String,
    #[serde(default)]
    pub title: String,
}

impl Resource {
    pub fn new(id: u64, url: impl Into<String>) -> Self {
        Self {
            id: ResourceId(id),
            url: url.into(),
            title: String::new(),
        }
    }
}

/// A scheduled future time window tracked for reminders and auto-activation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Meeting {
    /// Time-based identifier, unique within the process.
    pub id: String,
    pub title: String,
    pub start_time: DateTime<Utc>,
    pub created: DateTime<Utc>,
}

impl Meeting {
    /// Create a meeting stamped with `created` and a fresh time-based id.
    pub fn new(title: impl Into<String>, start_time: DateTime<Utc>, created: DateTime<Utc>) -> Self {
        let seq = NEXT_MEETING_SEQ.fetch_add(1, Ordering::Relaxed);
        Self {
            id: format!("meeting-{}-{seq}", created.timestamp_millis()),
            title: title.into(),
            start_time,
            created,
        }
    }

    /// `true` while the meeting has not started yet.
    pub fn is_upcoming(&self, now: DateTime<Utc>) -> bool {
        self.start_time > now
    }

    /// `true` once the meeting started more than `retention` ago.
    pub fn is_stale(&self, now: DateTime<Utc>, retention: Duration) -> bool {
        !self.is_upcoming(now) && self.start_time < now - retention
    }

    /// Whole minutes from `now` until the meeting starts, rounded up.
    pub fn minutes_until(&self, now: DateTime<Utc>) -> i64 {
        let secs = (self.start_time - now).num_seconds();
        if secs <= 0 {
            0
        } else {
            (secs + 59) / 60
        }
    }
}

/// Action items pulled from one resource's text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedActions {
    pub timestamp: DateTime<Utc>,
    pub source_url: String,
    pub items: Vec<String>,
}

impl ExtractedActions {
    /// Build a cache entry, keeping at most [`MAX_ACTION_ITEMS`] items.
    pub fn new(source_url: impl Into<String>, mut items: Vec<String>, timestamp: DateTime<Utc>) -> Self {
        items.truncate(MAX_ACTION_ITEMS);
        Self {
            timestamp,
            source_url: source_url.into(),
            items,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>, max_age: Duration) -> bool {
        now - self.timestamp > max_age
    }
}

/// Urgency attached to a user-facing notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Urgent,
}

/// A user-facing alert handed to the notification sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub message: String,
    pub severity: Severity,
}

impl Notification {
    pub fn info(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            severity: Severity::Info,
        }
    }

    pub fn warning(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            severity: Severity::Warning,
        }
    }

    pub fn urgent(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            severity: Severity::Urgent,
        }
    }
}

/// Process-wide coordinator state. Persisted after every mutation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoordinatorState {
    pub active: bool,
    /// Only resources the coordinator itself hid.
    pub hidden_resources: BTreeSet<ResourceId>,
    /// Ordered by insertion.
    pub scheduled_meetings: Vec<Meeting>,
    pub settings: Settings,
}

impl CoordinatorState {
    pub fn hidden_count(&self) -> usize {
        self.hidden_resources.len()
    }

    pub fn is_hidden(&self, id: ResourceId) -> bool {
        self.hidden_resources.contains(&id)
    }

    /// The nearest meeting that has not started yet.
    pub fn next_meeting(&self, now: DateTime<Utc>) -> Option<&Meeting> {
        self.scheduled_meetings
            .iter()
            .filter(|m| m.is_upcoming(now))
            .min_by_key(|m| m.start_time)
    }

    /// Upcoming meetings starting within `window` of `now`, nearest first.
    pub fn meetings_within(&self, now: DateTime<Utc>, window: Duration) -> Vec<&Meeting> {
        let horizon = now + window;
        let mut found: Vec<&Meeting> = self
            .scheduled_meetings
            .iter()
            .filter(|m| m.is_upcoming(now) && m.start_time <= horizon)
            .collect();
        found.sort_by_key(|m| m.start_time);
        found
    }

    /// Drop meetings that started more than `retention` ago. Returns how many were removed.
    pub fn prune_meetings(&mut self, now: DateTime<Utc>, retention: Duration) -> usize {
        let before = self.scheduled_meetings.len();
        self.scheduled_meetings
            .retain(|m| !m.is_stale(now, retention));
        before - self.scheduled_meetings.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
    }

    #[test]
    fn test_meeting_ids_are_unique_for_same_instant() {
        let a = Meeting::new("A", t0(), t0());
        let b = Meeting::new("B", t0(), t0());
        assert_ne!(a.id, b.id);
        assert!(a.id.starts_with("meeting-"));
    }

    #[test]
    fn test_meeting_minutes_until_rounds_up() {
        let m = Meeting::new("Standup", t0() + Duration::seconds(230), t0());
        assert_eq!(m.minutes_until(t0()), 4);
        assert_eq!(m.minutes_until(t0() + Duration::minutes(10)), 0);
    }

    #[test]
    fn test_meeting_serialises_camel_case() {
        let m = Meeting::new("Review", t0(), t0());
        let json = serde_json::to_value(&m).unwrap();
        assert!(json.get("startTime").is_some());
        assert!(json.get("created").is_some());
    }

    #[test]
    fn test_next_meeting_picks_nearest_upcoming() {
        let mut state = CoordinatorState::default();
        state
            .scheduled_meetings
            .push(Meeting::new("later", t0() + Duration::hours(3), t0()));
        state
            .scheduled_meetings
            .push(Meeting::new("past", t0() - Duration::hours(1), t0()));
        state
            .scheduled_meetings
            .push(Meeting::new("soon", t0() + Duration::minutes(20), t0()));

        let next = state.next_meeting(t0()).unwrap();
        assert_eq!(next.title, "soon");
    }

    #[test]
    fn test_meetings_within_window() {
        let mut state = CoordinatorState::default();
        state
            .scheduled_meetings
            .push(Meeting::new("far", t0() + Duration::minutes(45), t0()));
        state
            .scheduled_meetings
            .push(Meeting::new("near", t0() + Duration::minutes(4), t0()));
        state
            .scheduled_meetings
            .push(Meeting::new("mid", t0() + Duration::minutes(25), t0()));

        let found = state.meetings_within(t0(), Duration::minutes(30));
        let titles: Vec<&str> = found.iter().map(|m| m.title.as_str()).collect();
        assert_eq!(titles, vec!["near", "mid"]);
    }

    #[test]
    fn test_prune_meetings_keeps_recent_and_upcoming() {
        let mut state = CoordinatorState::default();
        state
            .scheduled_meetings
            .push(Meeting::new("old", t0() - Duration::hours(30), t0()));
        state
            .scheduled_meetings
            .push(Meeting::new("yesterday-ish", t0() - Duration::hours(20), t0()));
        state
            .scheduled_meetings
            .push(Meeting::new("tomorrow", t0() + Duration::hours(24), t0()));

        let removed = state.prune_meetings(t0(), Duration::hours(24));
        assert_eq!(removed, 1);
        assert_eq!(state.scheduled_meetings.len(), 2);
        assert!(state.scheduled_meetings.iter().all(|m| m.title != "old"));
    }

    #[test]
    fn test_extracted_actions_truncates_and_expires() {
        let items: Vec<String> = (0..15).map(|i| format!("item {i}")).collect();
        let actions = ExtractedActions::new("https://docs.example.com", items, t0());
        assert_eq!(actions.items.len(), MAX_ACTION_ITEMS);
        assert!(!actions.is_expired(t0() + Duration::days(6), Duration::days(7)));
        assert!(actions.is_expired(t0() + Duration::days(8), Duration::days(7)));
    }

    #[test]
    fn test_state_round_trips_through_json() {
        let mut state = CoordinatorState {
            active: true,
            ..Default::default()
        };
        state.hidden_resources.insert(ResourceId(3));
        state
            .scheduled_meetings
            .push(Meeting::new("Sync", t0(), t0()));

        let json = serde_json::to_string(&state).unwrap();
        let back: CoordinatorState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, state);
    }
}
