//! CSV decoding.

use std::io::Read;

use crate::error::InputError;
use crate::types::ParsedFile;

use super::FileFormat;

/// Decode CSV bytes into a [`ParsedFile`].
///
/// Rules:
///
/// - The first record is the header line; labels are kept verbatim (no trimming).
/// - Every record must have as many fields as the header; ragged records are malformed.
/// - Input must be UTF-8.
pub fn parse_csv(bytes: &[u8]) -> Result<ParsedFile, InputError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(bytes);
    parse_csv_from_reader(&mut rdr)
}

/// Decode CSV data from an existing reader (custom delimiter, quoting, etc.).
pub fn parse_csv_from_reader<R: Read>(rdr: &mut csv::Reader<R>) -> Result<ParsedFile, InputError> {
    let headers: Vec<String> = rdr
        .headers()
        .map_err(|e| InputError::malformed(FileFormat::Csv, e))?
        .iter()
        .map(str::to_owned)
        .collect();

    let mut rows: Vec<Vec<String>> = Vec::new();
    for (row_idx0, result) in rdr.records().enumerate() {
        // 1-based line number for users; +1 again because the header is line 1.
        let user_row = row_idx0 + 2;
        let record = result.map_err(|e| {
            InputError::malformed(FileFormat::Csv, format!("record {user_row}: {e}"))
        })?;
        rows.push(record.iter().map(str::to_owned).collect());
    }

    Ok(ParsedFile::new(headers, rows))
}
