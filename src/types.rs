//! Core row-set types that flow through the pipeline.
//!
//! Both row sets store a shared, ordered header list plus row-major text cells. A row is a
//! mapping from header to value; the positional layout keeps column order a faithful echo of the
//! source file.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::registry::{Resource, Source};

/// Operator-supplied manual values, keyed by manual-field target column.
pub type ManualValues = BTreeMap<String, String>;

/// Rows decoded from one uploaded file, before any renaming or typing.
///
/// Headers are taken verbatim from the first structural row of the source and may contain
/// duplicates. Every row holds exactly `headers.len()` cells.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParsedFile {
    /// Raw header labels in file order.
    pub headers: Vec<String>,
    /// Row-major raw cell text.
    pub rows: Vec<Vec<String>>,
}

impl ParsedFile {
    /// Create a parsed file from headers and rows.
    ///
    /// Rows shorter than the header are padded with empty cells; longer rows are truncated.
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let width = headers.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, String::new());
                row
            })
            .collect();
        Self { headers, rows }
    }

    /// Number of data rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Iterate `(raw_header, raw_value)` pairs of one row in file order.
    pub fn row(&self, idx: usize) -> Option<impl Iterator<Item = (&str, &str)>> {
        let row = self.rows.get(idx)?;
        Some(
            self.headers
                .iter()
                .map(String::as_str)
                .zip(row.iter().map(String::as_str)),
        )
    }
}

/// Sanitized, manual-field-augmented rows ready to append to a Bronze table.
///
/// Column names are unique; every value is text.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TransformedRowSet {
    /// Sanitized column names (file columns first, then manual fields in config order).
    pub columns: Vec<String>,
    /// Row-major values aligned with `columns`.
    pub rows: Vec<Vec<String>>,
}

impl TransformedRowSet {
    /// Number of rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Index of a column by name.
    pub fn index_of(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    /// Value at (`row`, `column`), if both exist.
    pub fn get(&self, row: usize, column: &str) -> Option<&str> {
        let idx = self.index_of(column)?;
        self.rows.get(row)?.get(idx).map(String::as_str)
    }

    /// Rows rendered as ordered `column -> value` maps.
    pub fn to_records(&self) -> Vec<Vec<(String, String)>> {
        self.rows
            .iter()
            .map(|row| {
                self.columns
                    .iter()
                    .cloned()
                    .zip(row.iter().cloned())
                    .collect()
            })
            .collect()
    }

    /// A copy holding only the first `limit` rows.
    pub fn head(&self, limit: usize) -> Self {
        Self {
            columns: self.columns.clone(),
            rows: self.rows.iter().take(limit).cloned().collect(),
        }
    }
}

/// Destination table identifier `{source}.{category}_{resource}`, lowercased.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TableId {
    /// Schema part (the source technical name).
    pub schema: String,
    /// Table part (`{category}_{resource technical name}`).
    pub table: String,
}

impl TableId {
    /// Create a table id; both parts are lowercased.
    pub fn new(schema: impl AsRef<str>, table: impl AsRef<str>) -> Self {
        Self {
            schema: schema.as_ref().to_lowercase(),
            table: table.as_ref().to_lowercase(),
        }
    }

    /// Derive the destination table of `resource`, owned by `source`.
    pub fn for_resource(source: &Source, resource: &Resource) -> Self {
        Self::new(
            &source.technical_name,
            format!("{}_{}", resource.category, resource.technical_name),
        )
    }
}

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.schema, self.table)
    }
}
