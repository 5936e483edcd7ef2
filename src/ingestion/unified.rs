//! Unified decoding entrypoint.
//!
//! Dispatch is driven only by the format declared in the resource configuration. A file whose
//! name suggests another format is still decoded as the declared one (and typically fails as
//! malformed).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::InputError;
use crate::types::ParsedFile;

use super::{csv, html, json, parquet};

/// Supported file formats (declared per resource).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileFormat {
    /// Spreadsheet/workbook formats (decoder behind the `excel` feature).
    Excel,
    /// Comma-separated values.
    Csv,
    /// First `<table>` of an HTML document.
    Html,
    /// JSON array-of-objects, single object, or NDJSON.
    Json,
    /// Apache Parquet.
    Parquet,
}

impl FileFormat {
    /// Every declarable format.
    pub const ALL: [FileFormat; 5] =
        [Self::Excel, Self::Csv, Self::Html, Self::Json, Self::Parquet];

    /// Wire token (`excel`, `csv`, `html`, `json`, `parquet`).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Excel => "excel",
            Self::Csv => "csv",
            Self::Html => "html",
            Self::Json => "json",
            Self::Parquet => "parquet",
        }
    }

    /// File extensions a file picker should offer for this format.
    ///
    /// Advisory only; [`parse`] never looks at file names.
    pub fn accepted_extensions(self) -> &'static [&'static str] {
        match self {
            Self::Excel => &["xlsx", "xls"],
            Self::Csv => &["csv"],
            Self::Html => &["html", "htm"],
            Self::Json => &["json"],
            Self::Parquet => &["parquet"],
        }
    }

    /// Whether a decoder for this format is compiled in.
    pub fn has_decoder(self) -> bool {
        match self {
            Self::Excel => cfg!(feature = "excel"),
            Self::Csv | Self::Html | Self::Json | Self::Parquet => true,
        }
    }
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FileFormat {
    type Err = InputError;

    /// Parse a declared format token (case-insensitive). Unknown tokens fail fast.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|f| f.as_str() == token)
            .ok_or_else(|| InputError::UnsupportedFormat(s.to_string()))
    }
}

/// Decode `bytes` as `format`.
///
/// Fails with:
///
/// - `UnsupportedFormat` if no decoder is registered for `format`
/// - `MalformedFile` if the bytes are not valid `format` content
/// - `EmptyFile` if decoding yields zero data rows or no columns
///
/// ```rust
/// use bronze_ingest::ingestion::{parse, FileFormat};
///
/// let pf = parse(b"id,amount\n101,50\n102,75\n", FileFormat::Csv).unwrap();
/// assert_eq!(pf.headers, vec!["id", "amount"]);
/// assert_eq!(pf.row_count(), 2);
/// ```
pub fn parse(bytes: &[u8], format: FileFormat) -> Result<ParsedFile, InputError> {
    let parsed = match format {
        FileFormat::Csv => csv::parse_csv(bytes),
        FileFormat::Json => json::parse_json(bytes),
        FileFormat::Html => html::parse_html(bytes),
        FileFormat::Parquet => parquet::parse_parquet(bytes),
        FileFormat::Excel => parse_excel_dispatch(bytes),
    }?;

    if parsed.headers.is_empty() || parsed.row_count() == 0 {
        return Err(InputError::EmptyFile);
    }

    tracing::debug!(
        %format,
        bytes = bytes.len(),
        columns = parsed.headers.len(),
        rows = parsed.row_count(),
        "decoded file"
    );
    Ok(parsed)
}

/// Decode `bytes` using a declared format token from the external boundary.
pub fn parse_declared(bytes: &[u8], format_token: &str) -> Result<ParsedFile, InputError> {
    parse(bytes, format_token.parse()?)
}

fn parse_excel_dispatch(bytes: &[u8]) -> Result<ParsedFile, InputError> {
    #[cfg(feature = "excel")]
    {
        super::excel::parse_excel(bytes)
    }

    #[cfg(not(feature = "excel"))]
    {
        let _ = bytes;
        Err(InputError::UnsupportedFormat(FileFormat::Excel.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::{parse, parse_declared, FileFormat};
    use crate::error::InputError;

    #[test]
    fn tokens_round_trip_and_unknown_fails_fast() {
        for f in FileFormat::ALL {
            assert_eq!(f.as_str().parse::<FileFormat>().unwrap(), f);
        }
        assert_eq!(" CSV ".parse::<FileFormat>().unwrap(), FileFormat::Csv);
        assert!(matches!(
            parse_declared(b"a\n1\n", "xml"),
            Err(InputError::UnsupportedFormat(t)) if t == "xml"
        ));
    }

    #[test]
    fn header_only_file_is_empty() {
        assert!(matches!(
            parse(b"id,amount\n", FileFormat::Csv),
            Err(InputError::EmptyFile)
        ));
        assert!(matches!(parse(b"[]", FileFormat::Json), Err(InputError::EmptyFile)));
    }

    #[test]
    fn rows_without_columns_are_empty() {
        assert!(matches!(parse(b"[{}, {}]", FileFormat::Json), Err(InputError::EmptyFile)));
        assert!(matches!(parse(b"{}\n{}\n", FileFormat::Json), Err(InputError::EmptyFile)));
    }

    #[test]
    fn dispatch_ignores_content_shape() {
        // CSV bytes declared as JSON are decoded as JSON, and fail.
        assert!(matches!(
            parse(b"id,amount\n1,2\n", FileFormat::Json),
            Err(InputError::MalformedFile { .. })
        ));
    }
}
