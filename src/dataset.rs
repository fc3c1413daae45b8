use std::fs::File;
use std::io::Read;
use std::path::Path;

use calamine::{Data, Reader, open_workbook_auto};
use chrono::{Duration, NaiveDate};
use tracing::debug;

use crate::record::{CellValue, PlayerRecord, RawTable};

#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    #[error("failed to read file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("spreadsheet error in {path}: {source}")]
    Spreadsheet {
        path: String,
        source: calamine::Error,
    },

    #[error("spreadsheet {0} has no worksheet")]
    NoWorksheet(String),
}

const SPREADSHEET_EXTENSIONS: [&str; 4] = ["xlsx", "xlsm", "xls", "ods"];

/// Reads a headed CSV. Cells are kept as trimmed text; blank cells are absent.
pub fn read_table<R: Read>(rdr: R) -> Result<RawTable, DatasetError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(rdr);

    let columns = unique_columns(reader.headers()?.iter());

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result?;
        let mut row = PlayerRecord::new();
        for (column, cell) in columns.iter().zip(record.iter()) {
            if column.is_empty() || cell.is_empty() {
                continue;
            }
            row.insert(column, CellValue::from(cell));
        }
        rows.push(row);
    }

    debug!(columns = columns.len(), rows = rows.len(), "read player table");
    Ok(RawTable::new(columns, rows))
}

/// Reads the first worksheet of a spreadsheet. The first row is the header.
/// Numeric cells stay numbers; dates become `YYYY-MM-DD` text.
pub fn read_spreadsheet(path: &Path) -> Result<RawTable, DatasetError> {
    let display = path.display().to_string();
    let mut workbook = open_workbook_auto(path).map_err(|source| DatasetError::Spreadsheet {
        path: display.clone(),
        source,
    })?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| DatasetError::NoWorksheet(display.clone()))?
        .map_err(|source| DatasetError::Spreadsheet {
            path: display.clone(),
            source,
        })?;

    let mut sheet_rows = range.rows();
    let Some(header) = sheet_rows.next() else {
        return Ok(RawTable::default());
    };
    let header: Vec<String> = header
        .iter()
        .map(|cell| spreadsheet_cell(cell).map(|v| v.to_string()).unwrap_or_default())
        .collect();
    let columns = unique_columns(header.iter().map(String::as_str));

    let mut rows = Vec::new();
    for cells in sheet_rows {
        if cells.iter().all(|c| spreadsheet_cell(c).is_none()) {
            continue;
        }
        let mut row = PlayerRecord::new();
        for (column, cell) in columns.iter().zip(cells) {
            if column.is_empty() {
                continue;
            }
            if let Some(value) = spreadsheet_cell(cell) {
                row.insert(column, value);
            }
        }
        rows.push(row);
    }

    debug!(path = %path.display(), columns = columns.len(), rows = rows.len(), "read player sheet");
    Ok(RawTable::new(columns, rows))
}

/// Loads a CSV, or a spreadsheet when the extension says so.
pub fn load_table(path: &Path) -> Result<RawTable, DatasetError> {
    let is_spreadsheet = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| SPREADSHEET_EXTENSIONS.iter().any(|x| e.eq_ignore_ascii_case(x)));
    if is_spreadsheet {
        return read_spreadsheet(path);
    }
    let file = File::open(path).map_err(|source| DatasetError::Io {
        path: path.display().to_string(),
        source,
    })?;
    read_table(file)
}

/// Trimmed header names. A repeated name gets a `.1`, `.2`, ... suffix so no
/// column shadows another.
fn unique_columns<'a>(headers: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut columns: Vec<String> = Vec::new();
    for raw in headers {
        let name = raw.trim_start_matches('\u{feff}').trim();
        let mut candidate = name.to_string();
        let mut n = 0;
        while !name.is_empty() && columns.contains(&candidate) {
            n += 1;
            candidate = format!("{name}.{n}");
        }
        columns.push(candidate);
    }
    columns
}

fn spreadsheet_cell(cell: &Data) -> Option<CellValue> {
    match cell {
        Data::Empty | Data::Error(_) => None,
        Data::Int(v) => Some(CellValue::Number(*v as f64)),
        Data::Float(v) => Some(CellValue::Number(*v)),
        Data::Bool(v) => Some(CellValue::from(v.to_string())),
        Data::DateTime(dt) => excel_serial_date(dt.as_f64())
            .map(|d| CellValue::from(d.format("%Y-%m-%d").to_string())),
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => {
            let s = s.trim();
            if s.is_empty() {
                None
            } else {
                Some(CellValue::from(s))
            }
        }
    }
}

fn excel_serial_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    epoch.checked_add_signed(Duration::days(serial.trunc() as i64))
}
