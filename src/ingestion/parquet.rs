//! Parquet decoding.

use std::collections::HashMap;

use bytes::Bytes;
use parquet::file::reader::FileReader;
use parquet::file::serialized_reader::SerializedFileReader;
use parquet::record::Field;

use crate::error::InputError;
use crate::types::ParsedFile;

use super::FileFormat;

/// Decode a Parquet file into a [`ParsedFile`].
///
/// Notes:
/// - Headers are the top-level schema fields in schema order.
/// - Uses the Parquet record API (`RowIter`); every value is rendered as text, nulls as empty
///   cells, nested groups/lists in their Parquet display form.
pub fn parse_parquet(bytes: &[u8]) -> Result<ParsedFile, InputError> {
    let reader = SerializedFileReader::new(Bytes::copy_from_slice(bytes))
        .map_err(|e| InputError::malformed(FileFormat::Parquet, e))?;

    let headers: Vec<String> = reader
        .metadata()
        .file_metadata()
        .schema_descr()
        .root_schema()
        .get_fields()
        .iter()
        .map(|f| f.name().to_string())
        .collect();
    let positions: HashMap<String, usize> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| (h.clone(), i))
        .collect();

    let iter = reader
        .get_row_iter(None)
        .map_err(|e| InputError::malformed(FileFormat::Parquet, e))?;

    let mut rows: Vec<Vec<String>> = Vec::new();
    for (idx0, row_res) in iter.enumerate() {
        let row = row_res.map_err(|e| {
            InputError::malformed(FileFormat::Parquet, format!("row {}: {e}", idx0 + 1))
        })?;

        let mut cells = vec![String::new(); headers.len()];
        for (name, field) in row.get_column_iter() {
            if let Some(&idx) = positions.get(name.as_str()) {
                cells[idx] = field_text(field);
            }
        }
        rows.push(cells);
    }

    Ok(ParsedFile::new(headers, rows))
}

fn field_text(f: &Field) -> String {
    match f {
        Field::Null => String::new(),
        // `Display` quotes strings; keep the raw text.
        Field::Str(s) => s.clone(),
        Field::Bytes(b) => String::from_utf8_lossy(b.data()).into_owned(),
        other => other.to_string(),
    }
}
