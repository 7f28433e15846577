//! Common regex patterns for basket table extraction.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Runs of whitespace, including the non-breaking space
    pub static ref WHITESPACE: Regex = Regex::new(r"[\s\u{00a0}]+").unwrap();

    // Price cell: optional currency before or after, digits with separators,
    // trailing footnote markers
    pub static ref PRICE: Regex = Regex::new(
        r"(?i)^(?:zar|r|\$|€|£)?\s*([+-]?\s*[0-9][0-9\s\u{00a0},.']*)\s*(?:zar|r)?\s*[*†‡¹²³]*$"
    ).unwrap();

    // Trailing parenthesised unit, e.g. "Maize meal (kg)"
    pub static ref UNIT_SUFFIX: Regex = Regex::new(
        r"\(\s*([^()]+?)\s*\)\s*$"
    ).unwrap();

    // Month followed by year, e.g. "JANUARY 2026" or "Sept 2025"
    pub static ref MONTH_YEAR: Regex = Regex::new(
        r"(?i)\b(jan(?:uary)?|feb(?:ruary)?|mar(?:ch)?|apr(?:il)?|may|june?|july?|aug(?:ust)?|sep(?:t(?:ember)?)?|oct(?:ober)?|nov(?:ember)?|dec(?:ember)?)\.?\s+(\d{4})\b"
    ).unwrap();
}

/// Lowercase and collapse whitespace for matching.
pub fn normalize_text(s: &str) -> String {
    WHITESPACE.replace_all(s.trim(), " ").to_lowercase()
}

/// Collapse whitespace (including line breaks inside cells) without changing case.
pub fn clean_cell(s: &str) -> String {
    WHITESPACE.replace_all(s.trim(), " ").into_owned()
}

/// Check whether `needle` occurs in `haystack` starting at a word boundary.
pub fn contains_at_word_start(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return false;
    }
    haystack.match_indices(needle).any(|(pos, _)| {
        haystack[..pos]
            .chars()
            .next_back()
            .map_or(true, |c| !c.is_alphanumeric())
    })
}
