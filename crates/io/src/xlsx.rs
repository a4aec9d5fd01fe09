// Dispatch sheet import (xlsx, xls, xlsb, ods) via calamine

use std::path::Path;

use calamine::{open_workbook_auto, Data, Range, Reader};

use dyetrack_recon::Cell;

/// Maximum number of rows read from a dispatch sheet
const MAX_ROWS: usize = 65536;

/// Maximum number of columns read per row
const MAX_COLS: usize = 256;

/// Read the first worksheet of a spreadsheet into a dense cell grid.
///
/// Row and column indices are absolute: a used range starting at C3 yields
/// two empty leading rows and two empty leading cells per row.
pub fn read_first_sheet(path: &Path) -> Result<Vec<Vec<Cell>>, crate::IoError> {
    let mut workbook = open_workbook_auto(path).map_err(|e| crate::IoError::Open {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or(crate::IoError::NoSheets)?;

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| crate::IoError::Sheet {
            sheet: sheet_name.clone(),
            message: e.to_string(),
        })?;

    let rows = range_to_cells(&range);
    tracing::debug!(sheet = %sheet_name, rows = rows.len(), "read dispatch sheet");
    Ok(rows)
}

/// Convert a calamine range into absolute-indexed cells.
pub fn range_to_cells(range: &Range<Data>) -> Vec<Vec<Cell>> {
    let (start_row, start_col) = range
        .start()
        .map(|(r, c)| (r as usize, c as usize))
        .unwrap_or((0, 0));

    let mut rows: Vec<Vec<Cell>> = vec![Vec::new(); start_row.min(MAX_ROWS)];

    for row in range.rows() {
        if rows.len() >= MAX_ROWS {
            tracing::warn!(limit = MAX_ROWS, "dispatch sheet truncated");
            break;
        }
        let mut cells = vec![Cell::Empty; start_col.min(MAX_COLS)];
        cells.extend(row.iter().take(MAX_COLS.saturating_sub(start_col)).map(convert));
        // Trailing empties carry no data
        while matches!(cells.last(), Some(Cell::Empty)) {
            cells.pop();
        }
        rows.push(cells);
    }

    rows
}

fn convert(data: &Data) -> Cell {
    match data {
        Data::Empty => Cell::Empty,
        Data::String(s) => {
            if s.is_empty() {
                Cell::Empty
            } else {
                Cell::Text(s.clone())
            }
        }
        Data::Float(n) => Cell::Number(*n),
        Data::Int(n) => Cell::Number(*n as f64),
        Data::Bool(b) => Cell::Bool(*b),
        // Dates stay as serials; the parser turns them into calendar dates
        Data::DateTime(dt) => Cell::Number(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::Text(s.clone()),
        Data::Error(e) => Cell::Text(format!("#{:?}", e)),
    }
}
