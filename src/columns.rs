//! Column heuristics for uploaded review tables: which column holds the
//! review text, where the header row is, and light clean-up of column names.
//! Kept apart from the classifier; nothing here influences a decision.

use serde::Serialize;

use crate::dataset::{Cell, Dataset};

/// Header names that identify the review-text column outright.
const REVIEW_HEADERS: &[&str] = &[
    "review",
    "reseña",
    "resena",
    "comentario",
    "texto",
    "opinion",
    "opinión",
    "comment",
    "feedback",
];

/// Extra header cells that mark a header row in moderation templates.
const TEMPLATE_HEADERS: &[&str] = &["estado", "criterio de moderación", "criterio de moderacion"];

/// Sampled non-missing values per column when guessing by content.
const SAMPLE_SIZE: usize = 20;
/// Minimum average length (chars) of sampled values for a free-text column.
const MIN_AVG_TEXT_LEN: f64 = 10.0;
/// Only this many leading rows are scanned for a header row.
pub const HEADER_SCAN_ROWS: usize = 10;

pub const ROW_NUMBER_COLUMN: &str = "Correlativo";
const BLANK_COLUMN_NAME: &str = "columna";
const BLANK_SHARE_TO_DROP: f64 = 0.80;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ColumnGuess {
    Found { column: String },
    /// No header match and not exactly one free-text column.
    Undetermined { candidates: Vec<String> },
}

impl ColumnGuess {
    pub fn column(&self) -> Option<&str> {
        match self {
            ColumnGuess::Found { column } => Some(column),
            ColumnGuess::Undetermined { .. } => None,
        }
    }
}

/// Find the review-text column: a known header name first, otherwise the only
/// column whose first sampled values average at least 10 characters.
pub fn guess_review_column(ds: &Dataset) -> ColumnGuess {
    if let Some(c) = ds
        .columns
        .iter()
        .find(|c| REVIEW_HEADERS.contains(&c.trim().to_lowercase().as_str()))
    {
        return ColumnGuess::Found { column: c.clone() };
    }

    let mut candidates: Vec<String> = ds
        .columns
        .iter()
        .enumerate()
        .filter(|(idx, _)| {
            let lens: Vec<usize> = ds
                .column_values(*idx)
                .flatten()
                .take(SAMPLE_SIZE)
                .map(|v| v.chars().count())
                .collect();
            !lens.is_empty()
                && lens.iter().sum::<usize>() as f64 / lens.len() as f64 >= MIN_AVG_TEXT_LEN
        })
        .map(|(_, c)| c.clone())
        .collect();

    if candidates.len() == 1 {
        ColumnGuess::Found {
            column: candidates.remove(0),
        }
    } else {
        ColumnGuess::Undetermined { candidates }
    }
}

/// An explicitly requested column wins when it exists; otherwise guess.
pub fn resolve_review_column(ds: &Dataset, requested: Option<&str>) -> ColumnGuess {
    match requested.map(str::trim).filter(|r| !r.is_empty()) {
        Some(r) if ds.column_index(r).is_some() => ColumnGuess::Found {
            column: r.to_string(),
        },
        _ => guess_review_column(ds),
    }
}

/// A raw row is a header row when it names a known header and has at least two filled cells.
pub fn looks_like_header_row(cells: &[Cell]) -> bool {
    let vals: Vec<String> = cells
        .iter()
        .map(|c| c.as_deref().unwrap_or("").trim().to_lowercase())
        .collect();
    let hits = vals
        .iter()
        .filter(|v| REVIEW_HEADERS.contains(&v.as_str()) || TEMPLATE_HEADERS.contains(&v.as_str()))
        .count();
    let non_empty = vals.iter().filter(|v| !v.is_empty()).count();
    hits >= 1 && non_empty >= 2
}

/// Index of the first header row among the leading rows, if any.
///
/// Only title or blank lines (fewer than two filled cells) may sit above a
/// header row; the first row with two or more filled cells that is not a
/// header row ends the scan, and the caller keeps row 0 as the header.
pub fn find_header_row(rows: &[Vec<Cell>]) -> Option<usize> {
    for (i, r) in rows.iter().take(HEADER_SCAN_ROWS).enumerate() {
        if looks_like_header_row(r) {
            return Some(i);
        }
        if filled_cells(r) >= 2 {
            return None;
        }
    }
    None
}

fn filled_cells(cells: &[Cell]) -> usize {
    cells
        .iter()
        .filter(|c| c.as_deref().is_some_and(|v| !v.trim().is_empty()))
        .count()
}

/// Trim column names; blank names become `columna`.
pub fn clean_column_names(ds: &mut Dataset) {
    for c in &mut ds.columns {
        let trimmed = c.trim();
        *c = if trimmed.is_empty() {
            BLANK_COLUMN_NAME.to_string()
        } else {
            trimmed.to_string()
        };
    }
}

/// Drop placeholder columns (`col_0`, `columna`, `unnamed: N`, `nan`) that are mostly empty.
/// Other `col_N` names are kept: they label blank header cells inside the table.
pub fn drop_blank_placeholder_columns(ds: &mut Dataset) {
    if ds.is_empty() {
        return;
    }
    let mut idx = 0;
    while idx < ds.columns.len() {
        if is_placeholder_name(&ds.columns[idx]) && blank_share(ds, idx) >= BLANK_SHARE_TO_DROP {
            ds.remove_column(idx);
        } else {
            idx += 1;
        }
    }
}

fn is_placeholder_name(name: &str) -> bool {
    let n = name.trim().to_lowercase();
    n == "col_0" || n == BLANK_COLUMN_NAME || n == "nan" || n.starts_with("unnamed:")
}

fn blank_share(ds: &Dataset, idx: usize) -> f64 {
    let blanks = ds
        .column_values(idx)
        .filter(|v| match v {
            None => true,
            Some(s) => {
                let t = s.trim();
                t.is_empty() || t.eq_ignore_ascii_case("nan")
            }
        })
        .count();
    blanks as f64 / ds.len() as f64
}

/// Insert a 1-based row-number column first. Returns the name used
/// (`Correlativo`, or `Correlativo 2`, `Correlativo 3`, ... when taken).
pub fn add_row_number_column(ds: &mut Dataset) -> String {
    let mut name = ROW_NUMBER_COLUMN.to_string();
    let mut n = 2;
    while ds.column_index(&name).is_some() {
        name = format!("{ROW_NUMBER_COLUMN} {n}");
        n += 1;
    }
    let values = (1..=ds.len()).map(|i| Some(i.to_string())).collect();
    ds.insert_column(0, name.clone(), values);
    name
}

/// Standard clean-up applied to every upload before moderation.
pub fn prepare(ds: &mut Dataset) -> String {
    clean_column_names(ds);
    drop_blank_placeholder_columns(ds);
    add_row_number_column(ds)
}

/// Lower-case, strip Spanish/Latin accents, `_` → space, collapse whitespace.
pub fn fold_column_name(name: &str) -> String {
    let folded: String = name
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| match c {
            'á' | 'à' | 'ä' | 'â' => 'a',
            'é' | 'è' | 'ë' | 'ê' => 'e',
            'í' | 'ì' | 'ï' | 'î' => 'i',
            'ó' | 'ò' | 'ö' | 'ô' => 'o',
            'ú' | 'ù' | 'ü' | 'û' => 'u',
            'ñ' => 'n',
            '_' => ' ',
            other => other,
        })
        .collect();
    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}
