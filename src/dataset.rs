//! Tabular dataset moderation.
//!
//! Order:
//! 1) duplicate mask in one forward pass (depends on row order)
//! 2) per-row classification, independent per row (parallel)
//! 3) result columns appended in a fixed order
//!
//! Re-running on the same input yields the same decisions.

use std::collections::HashSet;

use anyhow::anyhow;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::columns::fold_column_name;
use crate::decision::{
    Classification, Decision, COL_CLASSIFICATION, COL_EXPLANATION, COL_HUMAN_FACTOR,
};
use crate::moderator::classify;
use crate::policy::Policy;
use crate::text::dedup_key;

/// Missing cells are `None`.
pub type Cell = Option<String>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub columns: Vec<String>,
    #[serde(default)]
    pub rows: Vec<Vec<Cell>>,
}

impl Dataset {
    /// Rows shorter than the header are padded with missing cells, longer ones truncated.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut r| {
                r.resize(width, None);
                r
            })
            .collect();
        Self { columns, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Values of one column, missing cells as `None`.
    pub fn column_values(&self, idx: usize) -> impl Iterator<Item = Option<&str>> + '_ {
        self.rows
            .iter()
            .map(move |r| r.get(idx).and_then(|c| c.as_deref()))
    }

    pub fn push_column(&mut self, name: impl Into<String>, values: Vec<Cell>) {
        self.columns.push(name.into());
        let mut values = values.into_iter();
        for row in &mut self.rows {
            row.push(values.next().flatten());
        }
    }

    pub fn insert_column(&mut self, at: usize, name: impl Into<String>, values: Vec<Cell>) {
        let at = at.min(self.columns.len());
        self.columns.insert(at, name.into());
        let mut values = values.into_iter();
        for row in &mut self.rows {
            row.insert(at, values.next().flatten());
        }
    }

    pub fn remove_column(&mut self, idx: usize) {
        if idx >= self.columns.len() {
            return;
        }
        self.columns.remove(idx);
        for row in &mut self.rows {
            if idx < row.len() {
                row.remove(idx);
            }
        }
    }

    fn set_column(&mut self, idx: usize, values: impl IntoIterator<Item = Cell>) {
        for (row, v) in self.rows.iter_mut().zip(values) {
            row[idx] = v;
        }
    }
}

/// Per-row duplicate flags: a row is a duplicate when its normalized,
/// lower-cased text equals that of any earlier row. First occurrences are never flagged.
pub fn duplicate_mask<'a, I>(texts: I) -> Vec<bool>
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    let mut seen = HashSet::new();
    texts
        .into_iter()
        .map(|t| !seen.insert(dedup_key(t)))
        .collect()
}

/// Classify a sequence of review texts. Output is parallel to the input.
pub fn classify_texts(texts: &[Option<&str>], policy: &Policy) -> Vec<Decision> {
    let mask = duplicate_mask(texts.iter().copied());
    texts
        .par_iter()
        .zip(mask.par_iter())
        .map(|(text, dup)| classify(*text, policy, *dup))
        .collect()
}

/// A dataset after moderation: the input plus three result columns, and the
/// decisions one-to-one with rows.
#[derive(Debug, Clone, PartialEq)]
pub struct ModerationRun {
    pub review_column: String,
    pub dataset: Dataset,
    pub decisions: Vec<Decision>,
}

/// Classify every row of `ds` using the text in `review_column`.
pub fn classify_dataset(
    ds: &Dataset,
    review_column: &str,
    policy: &Policy,
) -> anyhow::Result<ModerationRun> {
    let idx = ds
        .column_index(review_column)
        .ok_or_else(|| anyhow!("column '{review_column}' not found"))?;
    let texts: Vec<Option<&str>> = ds.column_values(idx).collect();
    let decisions = classify_texts(&texts, policy);

    let mut out = ds.clone();
    out.push_column(
        COL_CLASSIFICATION,
        decisions
            .iter()
            .map(|d| Some(d.classification.label().to_string()))
            .collect(),
    );
    out.push_column(
        COL_EXPLANATION,
        decisions.iter().map(|d| Some(d.explanation.clone())).collect(),
    );
    out.push_column(
        COL_HUMAN_FACTOR,
        decisions.iter().map(|d| Some(d.human_factor.clone())).collect(),
    );

    for d in &decisions {
        metrics::counter!(
            "reviews_classified_total",
            "classification" => d.classification.label(),
            "rule" => d.rule.as_str()
        )
        .increment(1);
    }
    metrics::counter!("datasets_moderated_total").increment(1);

    let run = ModerationRun {
        review_column: review_column.to_string(),
        dataset: out,
        decisions,
    };
    let s = run.summary();
    info!(
        rows = s.total,
        approve = s.approve.count,
        deny = s.deny.count,
        review = s.human_review.count,
        "dataset moderated"
    );
    Ok(run)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Share {
    pub count: usize,
    /// Percentage of all rows, rounded to two decimals.
    pub pct: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub total: usize,
    #[serde(rename = "Aprobar")]
    pub approve: Share,
    #[serde(rename = "Denegar")]
    pub deny: Share,
    #[serde(rename = "Revisión humana requerida")]
    pub human_review: Share,
}

pub fn summarize(decisions: &[Decision]) -> Summary {
    let total = decisions.len();
    let share = |c: Classification| {
        let count = decisions.iter().filter(|d| d.classification == c).count();
        let pct = if total == 0 {
            0.0
        } else {
            (count as f64 / total as f64 * 100.0 * 100.0).round() / 100.0
        };
        Share { count, pct }
    };
    Summary {
        total,
        approve: share(Classification::Approve),
        deny: share(Classification::Deny),
        human_review: share(Classification::RequiresHumanReview),
    }
}

/// Folded names of internal columns removed from the downloadable report.
const REPORT_DROP: &[&str] = &[
    "explicacion",
    "factor revision humana",
    "clasificacion ia",
    "explicacion ia",
    "factor ia",
];

impl ModerationRun {
    pub fn summary(&self) -> Summary {
        summarize(&self.decisions)
    }

    /// Presentation view: fills `estado` / `criterio de moderación` columns when
    /// present and drops internal explanation columns.
    pub fn report(&self) -> Dataset {
        let mut out = self.dataset.clone();

        if let Some(idx) = find_column(&out, |n| n == "estado") {
            let values = self
                .decisions
                .iter()
                .map(|d| Some(d.classification.status_label().to_string()));
            out.set_column(idx, values);
        }
        if let Some(idx) = find_column(&out, |n| n == "criterio de moderacion") {
            let values = self.decisions.iter().map(|d| Some(d.criterion().to_string()));
            out.set_column(idx, values);
        }

        while let Some(idx) = find_column(&out, |n| REPORT_DROP.contains(&n)) {
            out.remove_column(idx);
        }
        out
    }
}

fn find_column(ds: &Dataset, pred: impl Fn(&str) -> bool) -> Option<usize> {
    ds.columns
        .iter()
        .position(|c| pred(fold_column_name(c).as_str()))
}
