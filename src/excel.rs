//! Spreadsheet uploads (.xlsx, .xlsm, .xls, .ods) read through calamine.
//!
//! Cells are turned into text the same way a CSV upload would carry them, then
//! go through the shared header-row detection in [`crate::csv_io`].

use std::io::Cursor;

use anyhow::{anyhow, Result};
use calamine::{open_workbook_auto_from_rs, Data, Reader};

use crate::csv_io::table_from_raw;
use crate::dataset::{Cell, Dataset};

/// Parse the named sheet (or the first one) of a workbook into a dataset.
pub fn read_excel(bytes: &[u8], sheet: Option<&str>) -> Result<Dataset> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))
        .map_err(|e| anyhow!("opening spreadsheet: {e}"))?;

    let names: Vec<String> = workbook.sheet_names().to_vec();
    let target = match sheet.map(str::trim).filter(|s| !s.is_empty()) {
        Some(name) => {
            if !names.iter().any(|n| n == name) {
                return Err(anyhow!(
                    "sheet '{name}' not found; available: {}",
                    names.join(", ")
                ));
            }
            name.to_string()
        }
        None => names
            .first()
            .cloned()
            .ok_or_else(|| anyhow!("spreadsheet has no sheets"))?,
    };

    let range = workbook
        .worksheet_range(&target)
        .map_err(|e| anyhow!("reading sheet '{target}': {e}"))?;

    // keep spreadsheet coordinates: a table starting at B3 still has an empty column A
    let (row_off, col_off) = range
        .start()
        .map(|(r, c)| (r as usize, c as usize))
        .unwrap_or((0, 0));
    let mut raw: Vec<Vec<Cell>> = vec![Vec::new(); row_off];
    for row in range.rows() {
        let mut cells: Vec<Cell> = vec![None; col_off];
        cells.extend(row.iter().map(cell_text));
        raw.push(cells);
    }

    if raw.iter().all(|r| r.iter().all(Option::is_none)) {
        return Err(anyhow!("sheet '{target}' is empty"));
    }
    Ok(table_from_raw(raw))
}

fn cell_text(cell: &Data) -> Cell {
    let text = match cell {
        Data::Empty => return None,
        Data::String(s) => s.clone(),
        // whole numbers are stored as floats
        Data::Float(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
            (*f as i64).to_string()
        }
        Data::Float(f) => f.to_string(),
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        other => other.to_string(),
    };
    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}
