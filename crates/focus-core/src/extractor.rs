//! Action-item extraction from resource text.
//!
//! [`ActionExtractor`] is the seam the coordinator calls through;
//! [`KeywordExtractor`] is the built-in sentence/keyword heuristic.

use regex::Regex;
use std::sync::OnceLock;

use crate::models::MAX_ACTION_ITEMS;

/// Phrases that mark a sentence as a candidate action item (matched lowercase).
pub const ACTION_KEYWORDS: &[&str] = &[
    "action:",
    "todo:",
    "need to",
    "will",
    "should",
    "must",
    "requires",
    "assign",
    "follow up",
    "next steps",
];

/// Strategy for turning page text into ranked candidate action sentences.
pub trait ActionExtractor: Send + Sync {
    /// Return at most [`MAX_ACTION_ITEMS`] items, best first.
    fn extract(&self, text: &str) -> Vec<String>;
}

/// Keeps sentences that contain one of [`ACTION_KEYWORDS`], in document order.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordExtractor;

impl ActionExtractor for KeywordExtractor {
    fn extract(&self, text: &str) -> Vec<String> {
        split_sentences(text)
            .into_iter()
            .filter(|s| contains_keyword(s))
            .take(MAX_ACTION_ITEMS)
            .map(str::to_string)
            .collect()
    }
}

/// Split `text` on `.`, `!` and `?`, trimming whitespace and dropping empties.
pub fn split_sentences(text: &str) -> Vec<&str> {
    static SPLITTER: OnceLock<Regex> = OnceLock::new();
    let re = SPLITTER.get_or_init(|| Regex::new(r"[.!?]+").expect("regex is valid"));

    re.split(text)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

fn contains_keyword(sentence: &str) -> bool {
    let lower = sentence.to_lowercase();
    ACTION_KEYWORDS.iter().any(|k| lower.contains(k))
}
