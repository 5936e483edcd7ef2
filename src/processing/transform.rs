//! Header sanitization and manual-field merge.

use rayon::prelude::*;

use crate::registry::ResourceConfig;
use crate::sanitize::sanitize;
use crate::types::{ManualValues, ParsedFile, TransformedRowSet};

use super::validate::manual_value;

/// Where an output column takes its value from.
#[derive(Debug, Clone)]
enum ColumnSource {
    /// Index into the parsed row.
    File(usize),
    /// Constant manual value, identical on every row.
    Manual(String),
}

/// Rename every header via [`sanitize`] and append one column per manual field.
///
/// Precondition: [`super::validate`] succeeded for the same inputs. Behavior on invalid input is
/// not part of the contract.
///
/// Column rules:
///
/// - When two raw headers sanitize to the same name, the column keeps the position of the first
///   occurrence and takes its value from the later one (re-exports with cosmetic header changes
///   keep working).
/// - Manual fields follow the file columns in configuration order. An absent optional field
///   becomes an empty column, so a resource's column set is stable across uploads.
/// - Should a manual target equal a file column, the manual value wins.
///
/// Row order and count are preserved exactly; rows are never filtered or deduplicated.
pub fn transform(
    parsed: &ParsedFile,
    manual: &ManualValues,
    config: &ResourceConfig,
) -> TransformedRowSet {
    let mut columns: Vec<String> =
        Vec::with_capacity(parsed.headers.len() + config.manual_fields.len());
    let mut sources: Vec<ColumnSource> = Vec::with_capacity(columns.capacity());

    for (raw_idx, raw) in parsed.headers.iter().enumerate() {
        let name = sanitize(raw);
        match columns.iter().position(|c| *c == name) {
            Some(existing) => sources[existing] = ColumnSource::File(raw_idx),
            None => {
                columns.push(name);
                sources.push(ColumnSource::File(raw_idx));
            }
        }
    }

    for field in &config.manual_fields {
        let value = ColumnSource::Manual(
            manual_value(manual, &field.target)
                .unwrap_or_default()
                .to_string(),
        );
        match columns.iter().position(|c| *c == field.target) {
            Some(existing) => sources[existing] = value,
            None => {
                columns.push(field.target.clone());
                sources.push(value);
            }
        }
    }

    let rows: Vec<Vec<String>> = parsed
        .rows
        .par_iter()
        .map(|row| {
            sources
                .iter()
                .map(|src| match src {
                    ColumnSource::File(idx) => row.get(*idx).cloned().unwrap_or_default(),
                    ColumnSource::Manual(v) => v.clone(),
                })
                .collect()
        })
        .collect();

    tracing::debug!(
        columns = columns.len(),
        rows = rows.len(),
        manual_fields = config.manual_fields.len(),
        "transformed rows"
    );

    TransformedRowSet { columns, rows }
}

#[cfg(test)]
mod tests {
    use super::transform;
    use crate::ingestion::FileFormat;
    use crate::registry::{FieldType, ManualField, ResourceConfig};
    use crate::types::{ManualValues, ParsedFile};

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn later_duplicate_header_wins_at_first_position() {
        let pf = ParsedFile::new(
            strings(&["Müşteri", "Tutar", "MUSTERI "]),
            vec![strings(&["early", "10", "late"])],
        );
        let cfg = ResourceConfig::new(FileFormat::Csv, Vec::new());
        let out = transform(&pf, &ManualValues::new(), &cfg);
        assert_eq!(out.columns, strings(&["musteri", "tutar"]));
        assert_eq!(out.rows, vec![strings(&["late", "10"])]);
    }

    #[test]
    fn absent_optional_field_becomes_empty_column() {
        let pf = ParsedFile::new(strings(&["id"]), vec![strings(&["1"]), strings(&["2"])]);
        let cfg = ResourceConfig::new(
            FileFormat::Csv,
            vec![
                ManualField::new("Settlement Month", FieldType::Text, true),
                ManualField::new("Exchange Rate", FieldType::Decimal, false),
            ],
        );
        let mut manual = ManualValues::new();
        manual.insert("settlement_month".to_string(), " 2023-10 ".to_string());

        let out = transform(&pf, &manual, &cfg);
        assert_eq!(out.columns, strings(&["id", "settlement_month", "exchange_rate"]));
        assert_eq!(
            out.rows,
            vec![strings(&["1", "2023-10", ""]), strings(&["2", "2023-10", ""])]
        );
    }

    #[test]
    fn manual_value_wins_over_same_named_file_column() {
        let pf = ParsedFile::new(strings(&["Report Date"]), vec![strings(&["from-file"])]);
        let cfg = ResourceConfig::new(
            FileFormat::Csv,
            vec![ManualField::new("Report Date", FieldType::Date, true)],
        );
        let mut manual = ManualValues::new();
        manual.insert("report_date".to_string(), "2023-10-27".to_string());

        let out = transform(&pf, &manual, &cfg);
        assert_eq!(out.columns, strings(&["report_date"]));
        assert_eq!(out.rows, vec![strings(&["2023-10-27"])]);
    }
}
