//! decision.rs: moderation outcome for one review: classification, the rule
//! that decided it, a readable explanation and the optional human-factor tag.
//!
//! Explanations and tags are domain-facing Spanish text; the `rule` id is the
//! stable, machine-readable counterpart for tests and metrics.

use serde::{Deserialize, Serialize};

/// Result column names appended to a classified dataset, in order.
pub const COL_CLASSIFICATION: &str = "clasificacion";
pub const COL_EXPLANATION: &str = "explicacion";
pub const COL_HUMAN_FACTOR: &str = "factor_revision_humana";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Classification {
    #[serde(rename = "Aprobar")]
    Approve,
    #[serde(rename = "Denegar")]
    Deny,
    #[serde(rename = "Revisión humana requerida")]
    RequiresHumanReview,
}

impl Classification {
    pub const ALL: [Classification; 3] = [
        Classification::Approve,
        Classification::Deny,
        Classification::RequiresHumanReview,
    ];

    /// Label written to the classification column.
    pub fn label(self) -> &'static str {
        match self {
            Classification::Approve => "Aprobar",
            Classification::Deny => "Denegar",
            Classification::RequiresHumanReview => "Revisión humana requerida",
        }
    }

    /// Wording used for a report's `estado` column.
    pub fn status_label(self) -> &'static str {
        match self {
            Classification::Approve => "Aprobada",
            Classification::Deny => "Denegada",
            Classification::RequiresHumanReview => "Revisión humana",
        }
    }
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Which cascade rule produced the decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rule {
    Empty,
    Profanity,
    Url,
    Email,
    Phone,
    ContactSpam,
    Promo,
    Duplicate,
    Caps,
    Exclamations,
    Questions,
    RepeatedChars,
    RepeatedWords,
    Sarcasm,
    MixedSentiment,
    Gibberish,
    LowInfo,
    Accepted,
}

impl Rule {
    pub fn as_str(self) -> &'static str {
        match self {
            Rule::Empty => "empty",
            Rule::Profanity => "profanity",
            Rule::Url => "url",
            Rule::Email => "email",
            Rule::Phone => "phone",
            Rule::ContactSpam => "contact_spam",
            Rule::Promo => "promo",
            Rule::Duplicate => "duplicate",
            Rule::Caps => "caps",
            Rule::Exclamations => "exclamations",
            Rule::Questions => "questions",
            Rule::RepeatedChars => "repeated_chars",
            Rule::RepeatedWords => "repeated_words",
            Rule::Sarcasm => "sarcasm",
            Rule::MixedSentiment => "mixed_sentiment",
            Rule::Gibberish => "gibberish",
            Rule::LowInfo => "low_info",
            Rule::Accepted => "accepted",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub classification: Classification,
    pub rule: Rule,
    /// Never empty.
    pub explanation: String,
    /// Short tag for reporting; empty unless the review goes to a human.
    #[serde(default)]
    pub human_factor: String,
}

impl Decision {
    pub fn deny(rule: Rule, explanation: impl Into<String>) -> Self {
        Self {
            classification: Classification::Deny,
            rule,
            explanation: explanation.into(),
            human_factor: String::new(),
        }
    }

    pub fn review(
        rule: Rule,
        explanation: impl Into<String>,
        human_factor: impl Into<String>,
    ) -> Self {
        Self {
            classification: Classification::RequiresHumanReview,
            rule,
            explanation: explanation.into(),
            human_factor: human_factor.into(),
        }
    }

    pub fn approve(explanation: impl Into<String>) -> Self {
        Self {
            classification: Classification::Approve,
            rule: Rule::Accepted,
            explanation: explanation.into(),
            human_factor: String::new(),
        }
    }

    /// Text for a report's moderation-criterion column: the tag if any, else the explanation.
    pub fn criterion(&self) -> &str {
        if self.human_factor.is_empty() {
            &self.explanation
        } else {
            &self.human_factor
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn serialized_shape_uses_domain_labels() {
        let d = Decision::review(Rule::Caps, "Mayúsculas.", "Texto mayormente en MAYÚSCULAS.");
        let v = serde_json::to_value(&d).unwrap();
        assert_eq!(v["classification"], json!("Revisión humana requerida"));
        assert_eq!(v["rule"], json!("caps"));
        assert_eq!(v["human_factor"], json!("Texto mayormente en MAYÚSCULAS."));

        let back: Decision = serde_json::from_value(v).unwrap();
        assert_eq!(back, d);
    }

    #[test]
    fn labels_and_rule_ids_agree_with_serde() {
        for c in Classification::ALL {
            assert_eq!(serde_json::to_value(c).unwrap(), json!(c.label()));
        }
        assert_eq!(
            serde_json::to_value(Rule::RepeatedWords).unwrap(),
            json!(Rule::RepeatedWords.as_str())
        );
    }

    #[test]
    fn criterion_prefers_human_factor() {
        assert_eq!(Decision::deny(Rule::Url, "Incluye un enlace.").criterion(), "Incluye un enlace.");
        assert_eq!(Decision::review(Rule::Gibberish, "x", "tag").criterion(), "tag");
    }
}
