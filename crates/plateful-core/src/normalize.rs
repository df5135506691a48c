//! Text normalization for keys, search and tags

use crate::error::PlatefulError;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

static NON_WORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\p{L}\p{N}]+").expect("static pattern is valid"));
static WHITESPACE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("static pattern is valid"));
static TAG_JUNK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\p{L}\p{N}-]+").expect("static pattern is valid"));

/// Upper-bound sentinel for prefix range queries
pub const PREFIX_SENTINEL: char = '\u{f8ff}';

/// Reduce free text to a stable key fragment
///
/// Lowercases, drops apostrophes, and collapses every run of other
/// non-alphanumeric characters into a single `-`.
#[must_use]
pub fn normalize_key_part(raw: &str) -> String {
    let lowered = raw.trim().to_lowercase().replace(['\'', '\u{2019}'], "");
    NON_WORD
        .replace_all(&lowered, "-")
        .trim_matches('-')
        .to_string()
}

/// Deterministic restaurant key from name and street address
///
/// # Errors
/// `PlatefulError::Validation` when either part normalizes to nothing.
pub fn restaurant_key(name: &str, address: &str) -> Result<String, PlatefulError> {
    let name = normalize_key_part(name);
    let address = normalize_key_part(address);
    if name.is_empty() {
        return Err(PlatefulError::validation("restaurant name is required"));
    }
    if address.is_empty() {
        return Err(PlatefulError::validation("restaurant address is required"));
    }
    Ok(format!("{name}|{address}"))
}

/// Lowercase and collapse whitespace, as stored in `searchName` fields
#[must_use]
pub fn normalize_search(raw: &str) -> String {
    WHITESPACE
        .replace_all(raw.trim(), " ")
        .to_lowercase()
}

/// Exclusive upper bound of a prefix range
#[must_use]
pub fn prefix_upper_bound(prefix: &str) -> String {
    format!("{prefix}{PREFIX_SENTINEL}")
}

/// Normalize user-entered tags
///
/// Each tag is trimmed, stripped of leading `#`, lowercased, and has inner
/// whitespace turned into `-`. Empty results and duplicates are dropped;
/// first occurrence order is kept and at most `max` tags survive.
#[must_use]
pub fn normalize_tags<S: AsRef<str>>(tags: &[S], max: usize) -> Vec<String> {
    let mut seen = HashSet::new();
    tags.iter()
        .filter_map(|raw| {
            let lowered = raw.as_ref().trim().trim_start_matches('#').to_lowercase();
            let dashed = WHITESPACE.replace_all(&lowered, "-");
            let tag = TAG_JUNK.replace_all(&dashed, "").trim_matches('-').to_string();
            (!tag.is_empty()).then_some(tag)
        })
        .filter(|tag| seen.insert(tag.clone()))
        .take(max)
        .collect()
}
