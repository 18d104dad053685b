//! Domain classification of resource URLs.
//!
//! Built-in personal and work lists are extended (never replaced) by the
//! user's black/white lists, which take precedence over the built-ins. Meeting-platform domains are a fixed list used
//! by context detection only.

use std::collections::BTreeSet;
use url::Url;

use crate::settings::Settings;

// ── Built-in lists ────────────────────────────────────────────────────────────

pub const DEFAULT_PERSONAL_DOMAINS: &[&str] = &[
    "facebook.com",
    "instagram.com",
    "twitter.com",
    "x.com",
    "reddit.com",
    "youtube.com",
    "netflix.com",
    "tiktok.com",
    "pinterest.com",
    "twitch.tv",
    "hulu.com",
    "spotify.com",
    "whatsapp.com",
    "9gag.com",
];

pub const DEFAULT_WORK_DOMAINS: &[&str] = &[
    "github.com",
    "gitlab.com",
    "stackoverflow.com",
    "atlassian.net",
    "slack.com",
    "notion.so",
    "docs.google.com",
    "drive.google.com",
    "linear.app",
    "figma.com",
    "trello.com",
    "asana.com",
];

pub const MEETING_DOMAINS: &[&str] = &[
    "zoom.us",
    "meet.google.com",
    "teams.microsoft.com",
    "teams.live.com",
    "webex.com",
    "whereby.com",
    "gotomeeting.com",
];

// ── Classification ────────────────────────────────────────────────────────────

/// Category a URL falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Personal,
    Work,
    Meeting,
    Unclassified,
}

/// `true` when the URL's host equals one of `domains` or is a subdomain of one.
///
/// Matching is case-insensitive. Unparseable URLs and URLs without a host
/// never match.
pub fn is_domain_in_list<S: AsRef<str>>(url: &str, domains: &[S]) -> bool {
    let Some(host) = host_of(url) else {
        return false;
    };
    domains.iter().any(|d| host_matches(&host, d.as_ref()))
}

/// Built-in personal domains plus the user's blacklist.
pub fn personal_domains(settings: &Settings) -> Vec<String> {
    merged(DEFAULT_PERSONAL_DOMAINS, &settings.blacklist_domains)
}

/// Built-in work domains plus the user's whitelist.
pub fn work_domains(settings: &Settings) -> Vec<String> {
    merged(DEFAULT_WORK_DOMAINS, &settings.whitelist_domains)
}

/// Classify `url` against the current settings.
///
/// The user's lists outrank the built-in ones: blacklist, then whitelist,
/// then the built-in meeting, work and personal lists in that order.
pub fn classify(url: &str, settings: &Settings) -> Classification {
    let Some(host) = host_of(url) else {
        return Classification::Unclassified;
    };

    let in_user = |list: &BTreeSet<String>| list.iter().any(|d| host_matches(&host, d));
    let in_builtin = |list: &[&str]| list.iter().any(|d| host_matches(&host, d));

    if in_user(&settings.blacklist_domains) {
        Classification::Personal
    } else if in_user(&settings.whitelist_domains) {
        Classification::Work
    } else if in_builtin(MEETING_DOMAINS) {
        Classification::Meeting
    } else if in_builtin(DEFAULT_WORK_DOMAINS) {
        Classification::Work
    } else if in_builtin(DEFAULT_PERSONAL_DOMAINS) {
        Classification::Personal
    } else {
        Classification::Unclassified
    }
}

/// Shorthand for `classify(url, settings) == Personal`.
pub fn is_personal(url: &str, settings: &Settings) -> bool {
    classify(url, settings) == Classification::Personal
}

/// `true` when `url` points at a known meeting platform.
pub fn is_meeting_platform(url: &str) -> bool {
    is_domain_in_list(url, MEETING_DOMAINS)
}

// ── Private helpers ───────────────────────────────────────────────────────────

fn host_of(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?;
    Some(host.trim_end_matches('.').to_ascii_lowercase())
}

fn host_matches(host: &str, domain: &str) -> bool {
    let domain = domain.trim().trim_end_matches('.').to_ascii_lowercase();
    if domain.is_empty() {
        return false;
    }
    host == domain
        || host
            .strip_suffix(domain.as_str())
            .is_some_and(|prefix| prefix.ends_with('.'))
}

fn merged(defaults: &[&str], extra: &BTreeSet<String>) -> Vec<String> {
    let mut all: BTreeSet<String> = defaults.iter().map(|d| d.to_string()).collect();
    all.extend(extra.iter().cloned());
    all.into_iter().collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
