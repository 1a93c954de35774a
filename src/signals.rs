//! Text signal extractors.
//!
//! Every function here is pure and expects text that already went through
//! [`crate::text::normalize`]. Case handling is done inside each extractor.

use std::collections::{HashMap, HashSet};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::lexicon::Lexicons;
use crate::text::word_list;

static URL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(https?://\S+|www\.\S+)").expect("url regex"));
static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b").expect("email regex")
});
static PHONE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\+?\d[\d\s().-]{7,}\d)\b").expect("phone regex"));

/// Minimum word count before the repeated-word ratio is computed at all.
const REPEATED_WORD_MIN_WORDS: usize = 6;
const GIBBERISH_MIN_ALPHA_RATIO: f32 = 0.35;
const GIBBERISH_MAX_SYMBOL_RATIO: f32 = 0.35;

/// First profanity entry (lexicon order) that appears as a whole token.
pub fn profanity<'a>(text: &str, lex: &'a Lexicons) -> Option<&'a str> {
    let words: HashSet<String> = word_list(text).into_iter().collect();
    lex.profanity
        .iter()
        .find(|bad| words.contains(bad.as_str()))
        .map(String::as_str)
}

pub fn contains_url(text: &str) -> bool {
    URL_RE.is_match(text)
}

pub fn contains_email(text: &str) -> bool {
    EMAIL_RE.is_match(text)
}

/// Nine or more digit/space/punctuation characters bounded by digits, optional `+`.
pub fn contains_phone(text: &str) -> bool {
    PHONE_RE.is_match(text)
}

/// First spam/promo keyword found as a raw substring.
pub fn spam_keyword<'a>(text: &str, lex: &'a Lexicons) -> Option<&'a str> {
    first_substring(text, &lex.spam_promo)
}

/// First sarcasm marker found as a raw substring.
pub fn sarcasm_marker<'a>(text: &str, lex: &'a Lexicons) -> Option<&'a str> {
    first_substring(text, &lex.sarcasm)
}

/// Positive and negative vocabulary both present (substring match, not tokenized).
pub fn mixed_sentiment(text: &str, lex: &Lexicons) -> bool {
    let t = text.to_lowercase();
    let pos = lex.positive.iter().any(|w| t.contains(w.as_str()));
    let neg = lex.negative.iter().any(|w| t.contains(w.as_str()));
    pos && neg
}

/// Share of uppercase letters among alphabetic characters.
pub fn caps_ratio(text: &str) -> f32 {
    let (letters, caps) = text
        .chars()
        .filter(|c| c.is_alphabetic())
        .fold((0usize, 0usize), |(n, up), c| {
            (n + 1, up + usize::from(c.is_uppercase()))
        });
    if letters == 0 {
        return 0.0;
    }
    caps as f32 / letters as f32
}

pub fn exclamation_count(text: &str) -> usize {
    text.matches('!').count()
}

pub fn question_count(text: &str) -> usize {
    text.matches('?').count()
}

/// Longest run of one repeated character.
pub fn longest_char_run(text: &str) -> usize {
    let mut best = 0;
    let mut run = 0;
    let mut prev: Option<char> = None;
    for c in text.chars() {
        run = if prev == Some(c) { run + 1 } else { 1 };
        best = best.max(run);
        prev = Some(c);
    }
    best
}

/// True when some character repeats more than `max_run` times in a row.
pub fn repeated_char_run(text: &str, max_run: usize) -> bool {
    longest_char_run(text) > max_run
}

/// Frequency of the most common word over all words; 0.0 below six words.
pub fn repeated_word_ratio(text: &str) -> f32 {
    let words = word_list(text);
    if words.len() < REPEATED_WORD_MIN_WORDS {
        return 0.0;
    }
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for w in &words {
        *counts.entry(w.as_str()).or_default() += 1;
    }
    let top = counts.values().copied().max().unwrap_or(0);
    top as f32 / words.len() as f32
}

/// Low alphabetic density or high symbol density. Empty text counts as gibberish.
pub fn is_gibberish(text: &str) -> bool {
    let total = text.chars().count();
    if total == 0 {
        return true;
    }
    let alpha = text.chars().filter(|c| c.is_alphabetic()).count();
    if alpha == 0 {
        return true;
    }
    let symbols = text
        .chars()
        .filter(|c| !c.is_alphanumeric() && !c.is_whitespace())
        .count();
    let alpha_ratio = alpha as f32 / total as f32;
    let symbol_ratio = symbols as f32 / total as f32;
    alpha_ratio < GIBBERISH_MIN_ALPHA_RATIO || symbol_ratio > GIBBERISH_MAX_SYMBOL_RATIO
}

pub fn short_or_low_info(text: &str, min_words: usize, min_chars: usize) -> bool {
    word_list(text).len() < min_words || text.chars().count() < min_chars
}

fn first_substring<'a>(text: &str, terms: &'a [String]) -> Option<&'a str> {
    let t = text.to_lowercase();
    terms
        .iter()
        .find(|k| t.contains(k.as_str()))
        .map(String::as_str)
}
