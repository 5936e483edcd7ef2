//! Validation and transformation of parsed files.
//!
//! The processing layer operates on [`crate::types::ParsedFile`] values produced by
//! [`crate::ingestion`] and yields a [`crate::types::TransformedRowSet`] ready to commit.
//!
//! Currently implemented:
//!
//! - [`validate()`]: collects every schema violation before anything is transformed
//! - [`transform()`]: header sanitization + manual field merge
//! - [`prepare()`]: parse -> validate -> transform, as one read-only step
//!
//! ## Example: prepare a CSV export
//!
//! ```rust
//! use bronze_ingest::config::IngestionOptions;
//! use bronze_ingest::ingestion::FileFormat;
//! use bronze_ingest::processing::prepare;
//! use bronze_ingest::registry::{FieldType, ManualField, ResourceConfig};
//! use bronze_ingest::types::ManualValues;
//!
//! let config = ResourceConfig::new(
//!     FileFormat::Csv,
//!     vec![ManualField::new("Report Date", FieldType::Date, true)],
//! );
//! let mut manual = ManualValues::new();
//! manual.insert("report_date".to_string(), "2023-10-27".to_string());
//!
//! let bytes = b"Sipari\xc5\x9f No,Tutar\nTY-1,150.50\n";
//! let rows = prepare(bytes, &config, &manual, &IngestionOptions::default()).unwrap();
//! assert_eq!(rows.columns, vec!["siparis_no", "tutar", "report_date"]);
//! assert_eq!(rows.rows[0], vec!["TY-1", "150.50", "2023-10-27"]);
//! ```

pub mod transform;
pub mod validate;

pub use transform::transform;
pub use validate::{validate, validate_with_date_format, value_conforms, DEFAULT_DATE_FORMAT};

use serde::{Deserialize, Serialize};

use crate::config::IngestionOptions;
use crate::error::IngestResult;
use crate::ingestion::parse;
use crate::registry::ResourceConfig;
use crate::types::{ManualValues, TransformedRowSet};

/// Parse `bytes` as `config.format`, validate, and transform.
///
/// Read-only and side-effect free; safe to run concurrently without limit.
pub fn prepare(
    bytes: &[u8],
    config: &ResourceConfig,
    manual: &ManualValues,
    options: &IngestionOptions,
) -> IngestResult<TransformedRowSet> {
    let parsed = parse(bytes, config.format)?;
    validate_with_date_format(&parsed, config, manual, &options.date_format)?;
    Ok(transform(&parsed, manual, config))
}

/// Bounded view of a prepared row set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preview {
    /// Sanitized column names, in commit order.
    pub columns: Vec<String>,
    /// The first rows of the prepared set.
    pub rows: Vec<Vec<String>>,
    /// Rows that would be committed.
    pub total_rows: usize,
}

impl Preview {
    /// Preview the first `limit` rows of `rows`.
    pub fn of(rows: &TransformedRowSet, limit: usize) -> Self {
        let head = rows.head(limit);
        Self {
            columns: head.columns,
            rows: head.rows,
            total_rows: rows.row_count(),
        }
    }
}
