//! Text canonicalisation shared by every signal and by duplicate detection.

use once_cell::sync::Lazy;
use regex::Regex;

/// Word-like runs: ASCII letters, Spanish accented letters, digits, apostrophes.
static WORD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[A-Za-zÁÉÍÓÚÜÑáéíóúüñ0-9']+").expect("word regex"));

/// Trim and collapse every whitespace run (newlines, tabs, NBSP, ...) to one space.
/// Missing input normalizes to the empty string.
pub fn normalize(input: Option<&str>) -> String {
    match input {
        Some(s) => s.split_whitespace().collect::<Vec<_>>().join(" "),
        None => String::new(),
    }
}

/// Key used by the duplicate pre-pass: normalized and lower-cased.
pub fn dedup_key(input: Option<&str>) -> String {
    normalize(input).to_lowercase()
}

/// Lower-cased word tokens.
pub fn word_list(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    WORD_RE
        .find_iter(&lower)
        .map(|m| m.as_str().to_string())
        .collect()
}
