//! Text metrics and cleanup used to derive record metadata.
//!
//! Everything here is deterministic so derived fields can be asserted
//! exactly in tests.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::types::{ComplexityTier, ContentType};

pub const WORDS_PER_MINUTE: usize = 200;
pub const SUMMARY_MAX_CHARS: usize = 200;
pub const ELLIPSIS: &str = "...";

static WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\w+").expect("valid word regex"));
static HTML_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").expect("valid tag regex"));
static MARKDOWN_MARKS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[*_#\[\]]").expect("valid markdown regex"));

/// Keyword table for categorization. Order is the tie-break.
pub const CATEGORIES: &[(ContentType, &[&str])] = &[
    (
        ContentType::Research,
        &["paper", "study", "research", "method", "algorithm"],
    ),
    (
        ContentType::Product,
        &["product", "launch", "release", "tool", "platform"],
    ),
    (
        ContentType::News,
        &["announcement", "update", "collaboration", "partnership"],
    ),
];

pub fn word_count(text: &str) -> usize {
    WORD.find_iter(text).count()
}

/// Number of words containing at least one vowel.
pub fn syllable_proxy(text: &str) -> usize {
    WORD.find_iter(text)
        .filter(|m| {
            m.as_str()
                .chars()
                .any(|c| matches!(c.to_ascii_lowercase(), 'a' | 'e' | 'i' | 'o' | 'u'))
        })
        .count()
}

pub fn reading_minutes(text: &str) -> u32 {
    let minutes = word_count(text) / WORDS_PER_MINUTE;
    minutes.max(1) as u32
}

pub fn complexity_tier(text: &str) -> ComplexityTier {
    let words = word_count(text);
    let syllables = syllable_proxy(text);

    if words < 300 && syllables < 100 {
        ComplexityTier::Beginner
    } else if words < 600 && syllables < 200 {
        ComplexityTier::Intermediate
    } else {
        ComplexityTier::Advanced
    }
}

pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Strip HTML tags and collapse whitespace.
pub fn clean_text(text: &str) -> String {
    collapse_whitespace(&HTML_TAG.replace_all(text, " "))
}

/// Builds a short plain-text abstract from markdown content.
///
/// Text longer than [`SUMMARY_MAX_CHARS`] is cut at the last word boundary
/// before the limit and suffixed with [`ELLIPSIS`]. Shorter text is returned
/// as is.
pub fn summarize(text: &str) -> String {
    let plain = collapse_whitespace(&MARKDOWN_MARKS.replace_all(text, ""));
    if plain.chars().count() <= SUMMARY_MAX_CHARS {
        return plain;
    }

    let cut: String = plain.chars().take(SUMMARY_MAX_CHARS).collect();
    let at_boundary = plain
        .chars()
        .nth(SUMMARY_MAX_CHARS)
        .map_or(true, char::is_whitespace);

    let kept = if at_boundary {
        cut.as_str()
    } else {
        match cut.rfind(' ') {
            Some(idx) if idx > 0 => &cut[..idx],
            // a single token longer than the limit
            _ => cut.as_str(),
        }
    };

    format!("{}{}", kept.trim_end(), ELLIPSIS)
}

/// First category with any keyword in `text`, else `General`.
pub fn categorize(text: &str) -> ContentType {
    let lowered = text.to_lowercase();
    CATEGORIES
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| lowered.contains(k)))
        .map(|(category, _)| *category)
        .unwrap_or(ContentType::General)
}
