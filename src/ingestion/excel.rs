#![cfg(feature = "excel")]

use std::io::Cursor;

use calamine::{open_workbook_auto_from_rs, Data, ExcelDateTime, Reader};
use chrono::Timelike;

use crate::error::InputError;
use crate::types::ParsedFile;

use super::FileFormat;

/// Decode an Excel workbook (`.xlsx`, `.xls`, `.xlsb`, `.ods`) from memory.
///
/// Behavior:
/// - Uses the first sheet in the workbook
/// - Detects the first non-empty row as the header row
/// - Skips fully empty rows after the header (formatting residue in portal exports)
/// - Renders every cell as text; date cells as ISO `YYYY-MM-DD` (with `THH:MM:SS` when timed)
pub fn parse_excel(bytes: &[u8]) -> Result<ParsedFile, InputError> {
    parse_excel_sheet(bytes, None)
}

/// Decode one named sheet (or the first sheet when `sheet_name` is `None`).
pub fn parse_excel_sheet(
    bytes: &[u8],
    sheet_name: Option<&str>,
) -> Result<ParsedFile, InputError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
        .map_err(|e| InputError::malformed(FileFormat::Excel, e))?;

    let sheet = match sheet_name {
        Some(name) => name.to_string(),
        None => workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| InputError::malformed(FileFormat::Excel, "workbook has no sheets"))?,
    };
    let range = workbook
        .worksheet_range(&sheet)
        .map_err(|e| InputError::malformed(FileFormat::Excel, format!("sheet '{sheet}': {e}")))?;

    let mut non_empty = range
        .rows()
        .filter(|row| row.iter().any(|c| !matches!(c, Data::Empty)));

    let headers: Vec<String> = match non_empty.next() {
        Some(row) => row.iter().map(cell_text).collect(),
        None => return Err(InputError::EmptyFile),
    };
    let rows: Vec<Vec<String>> = non_empty
        .map(|row| row.iter().map(cell_text).collect())
        .collect();

    Ok(ParsedFile::new(headers, rows))
}

fn cell_text(c: &Data) -> String {
    match c {
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => {
            if f.fract() == 0.0 && f.abs() < 1e15 {
                (*f as i64).to_string()
            } else {
                f.to_string()
            }
        }
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => datetime_text(dt),
        Data::DateTimeIso(s) => s.clone(),
        Data::DurationIso(s) => s.clone(),
        Data::Error(e) => format!("{e:?}"),
        Data::Empty => String::new(),
    }
}

fn datetime_text(dt: &ExcelDateTime) -> String {
    match dt.as_datetime() {
        Some(ndt) if dt.is_datetime() => {
            if ndt.time().num_seconds_from_midnight() == 0 {
                ndt.format("%Y-%m-%d").to_string()
            } else {
                ndt.format("%Y-%m-%dT%H:%M:%S").to_string()
            }
        }
        // Durations and out-of-range serials keep the stored number.
        _ => dt.as_f64().to_string(),
    }
}
