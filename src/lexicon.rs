//! Static word lists consulted by the signal extractors.
//!
//! The default lists live in `review_lexicon.json` and are embedded at compile
//! time, parsed once and shared read-only for the lifetime of the process.
//! Lists are ordered: when several entries match, the first one listed wins,
//! which keeps explanations reproducible between runs.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

static DEFAULT_LEXICONS: Lazy<Lexicons> = Lazy::new(|| {
    let raw = include_str!("../review_lexicon.json");
    Lexicons::from_json_str(raw).expect("valid review lexicon")
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lexicons {
    /// Whole-token matches (case-insensitive).
    pub profanity: Vec<String>,
    /// Substring matches: promotional terms, messaging apps, "follow me" phrases.
    pub spam_promo: Vec<String>,
    /// Terms that turn a spam/promo hit into an outright denial when they occur
    /// inside the matched keyword (messaging apps, direct-message invitations).
    pub direct_contact: Vec<String>,
    pub positive: Vec<String>,
    pub negative: Vec<String>,
    pub sarcasm: Vec<String>,
}

impl Lexicons {
    /// Process-wide default lexicons.
    pub fn global() -> &'static Lexicons {
        &DEFAULT_LEXICONS
    }

    /// Parse a lexicon file. Entries are trimmed and lower-cased; blanks are dropped.
    pub fn from_json_str(raw: &str) -> anyhow::Result<Self> {
        let mut lex: Lexicons = serde_json::from_str(raw)?;
        for list in [
            &mut lex.profanity,
            &mut lex.spam_promo,
            &mut lex.direct_contact,
            &mut lex.positive,
            &mut lex.negative,
            &mut lex.sarcasm,
        ] {
            clean_list(list);
        }
        Ok(lex)
    }

    /// True when a detected spam keyword belongs to the direct-contact subset.
    pub fn is_direct_contact(&self, keyword: &str) -> bool {
        let kw = keyword.to_lowercase();
        self.direct_contact.iter().any(|c| kw.contains(c.as_str()))
    }
}

fn clean_list(items: &mut Vec<String>) {
    let mut seen = std::collections::HashSet::new();
    items.retain_mut(|it| {
        *it = it.trim().to_lowercase();
        !it.is_empty() && seen.insert(it.clone())
    });
}
