//! CSV in / CSV out for moderated review tables.

use anyhow::{anyhow, Context, Result};

use crate::columns::find_header_row;
use crate::dataset::{Cell, Dataset};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Decode UTF-8 (BOM tolerated), falling back to latin-1 for anything else.
pub fn decode_text(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        // latin-1 maps every byte straight to the code point of the same value
        Err(_) => bytes.iter().map(|&b| char::from(b)).collect(),
    }
}

/// Parse an uploaded CSV into a dataset.
///
/// Title lines above the table are skipped when a header row follows them;
/// otherwise the first row is the header. Empty cells are missing values and
/// fully empty rows are dropped.
pub fn read_csv(bytes: &[u8]) -> Result<Dataset> {
    let content = decode_text(bytes);
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut raw: Vec<Vec<Cell>> = Vec::new();
    for (i, rec) in reader.records().enumerate() {
        let rec = rec.with_context(|| format!("parsing CSV record {}", i + 1))?;
        raw.push(
            rec.iter()
                .map(|v| {
                    if v.trim().is_empty() {
                        None
                    } else {
                        Some(v.to_string())
                    }
                })
                .collect(),
        );
    }
    if raw.is_empty() {
        return Err(anyhow!("CSV file has no content"));
    }
    Ok(table_from_raw(raw))
}

/// Split raw rows into header and body. Shared by every tabular reader.
///
/// When a header row is detected, blank header cells become `col_<index>`;
/// when the first row is taken as is, they become `Unnamed: <index>`.
pub(crate) fn table_from_raw(mut raw: Vec<Vec<Cell>>) -> Dataset {
    let (header_idx, blank_prefix) = match find_header_row(&raw) {
        Some(i) => (i, "col_"),
        None => (0, "Unnamed: "),
    };
    let width = raw.iter().map(Vec::len).max().unwrap_or(0);
    let mut rows = raw.split_off((header_idx + 1).min(raw.len()));
    let header = raw.pop().unwrap_or_default();

    let columns: Vec<String> = (0..width)
        .map(|i| match header.get(i).cloned().flatten() {
            Some(h) => h.trim().to_string(),
            None => format!("{blank_prefix}{i}"),
        })
        .collect();

    rows.retain(|r| r.iter().any(Option::is_some));
    Dataset::new(columns, rows)
}

/// Serialize a dataset as CSV with a UTF-8 BOM so spreadsheet tools pick the encoding.
pub fn write_csv(ds: &Dataset) -> Result<Vec<u8>> {
    let mut wtr = csv::Writer::from_writer(UTF8_BOM.to_vec());
    wtr.write_record(&ds.columns)?;
    for row in &ds.rows {
        wtr.write_record(row.iter().map(|c| c.as_deref().unwrap_or("")))?;
    }
    wtr.into_inner().map_err(|e| anyhow!("flushing CSV: {}", e.error()))
}
