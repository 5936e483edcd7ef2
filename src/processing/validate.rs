//! Pre-transformation checks of a parsed file and manual values against a resource schema.

use std::collections::HashSet;

use chrono::NaiveDate;

use crate::error::{ValidationErrors, Violation};
use crate::registry::{FieldType, ResourceConfig};
use crate::sanitize::sanitize;
use crate::types::{ManualValues, ParsedFile};

/// The one accepted date format for `date` manual fields unless configured otherwise.
pub const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d";

/// Validate with the [`DEFAULT_DATE_FORMAT`].
///
/// See [`validate_with_date_format`].
pub fn validate(
    parsed: &ParsedFile,
    config: &ResourceConfig,
    manual: &ManualValues,
) -> Result<(), ValidationErrors> {
    validate_with_date_format(parsed, config, manual, DEFAULT_DATE_FORMAT)
}

/// Check `parsed` and `manual` against `config`, collecting every violation.
///
/// Checks, in report order:
///
/// - the file has at least one data row
/// - every raw header sanitizes to a non-empty name
/// - every required manual field has a non-blank value
/// - every present manual value converts to its declared type
/// - no manual field target equals a sanitized file header
///
/// No side effects. `Ok(())` means the transformer may run.
pub fn validate_with_date_format(
    parsed: &ParsedFile,
    config: &ResourceConfig,
    manual: &ManualValues,
    date_format: &str,
) -> Result<(), ValidationErrors> {
    let mut violations = Vec::new();

    if parsed.row_count() == 0 {
        violations.push(Violation::EmptyFile);
    }

    let mut file_columns: HashSet<String> = HashSet::with_capacity(parsed.headers.len());
    let mut reported: HashSet<&str> = HashSet::new();
    for raw in &parsed.headers {
        let name = sanitize(raw);
        if name.is_empty() {
            if reported.insert(raw.as_str()) {
                violations.push(Violation::UnresolvableHeader(raw.clone()));
            }
        } else {
            file_columns.insert(name);
        }
    }

    for field in &config.manual_fields {
        match manual_value(manual, &field.target) {
            None if field.required => {
                violations.push(Violation::MissingRequiredField(field.target.clone()));
            }
            None => {}
            Some(raw) => {
                if !value_conforms(field.field_type, raw, date_format) {
                    violations.push(Violation::TypeMismatch {
                        target: field.target.clone(),
                        expected: field.field_type,
                        raw: raw.to_string(),
                    });
                }
            }
        }

        if file_columns.contains(&field.target) {
            violations.push(Violation::ColumnCollision(field.target.clone()));
        }
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(ValidationErrors(violations))
    }
}

/// The trimmed manual value for `target`, or `None` when absent or blank.
pub(crate) fn manual_value<'a>(manual: &'a ManualValues, target: &str) -> Option<&'a str> {
    manual
        .get(target)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
}

/// Whether `raw` converts cleanly to `field_type`.
pub fn value_conforms(field_type: FieldType, raw: &str, date_format: &str) -> bool {
    match field_type {
        FieldType::Text => true,
        FieldType::Integer => raw.parse::<i64>().is_ok(),
        FieldType::Decimal => raw.parse::<f64>().is_ok_and(f64::is_finite),
        FieldType::Date => NaiveDate::parse_from_str(raw, date_format).is_ok(),
        FieldType::Boolean => parse_bool(raw).is_ok(),
    }
}

fn parse_bool(s: &str) -> Result<bool, String> {
    match s.to_ascii_lowercase().as_str() {
        "true" | "t" | "1" | "yes" | "y" => Ok(true),
        "false" | "f" | "0" | "no" | "n" => Ok(false),
        _ => Err("expected bool (true/false/1/0/yes/no)".to_string()),
    }
}
