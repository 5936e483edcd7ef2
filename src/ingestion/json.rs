//! JSON decoding.
//!
//! Supported inputs:
//! - A JSON array of objects: `[{"a":1}, {"a":2}]`
//! - A single object: `{"a":1}`
//! - Newline-delimited JSON (NDJSON): `{"a":1}\n{"a":2}\n`
//!
//! Headers are the union of object keys in first-seen order; a key missing from an object yields
//! an empty cell. Scalars are rendered as text, `null` as an empty cell, and nested arrays/objects
//! as compact JSON. Numbers keep their literal text (`19.90` stays `19.90`).
//!
//! Objects with no keys at all produce a file with no headers, which [`super::parse`] rejects as
//! empty.

use std::collections::HashMap;

use serde_json::{Map, Value};

use crate::error::InputError;
use crate::types::ParsedFile;

use super::FileFormat;

/// Decode JSON bytes into a [`ParsedFile`].
pub fn parse_json(bytes: &[u8]) -> Result<ParsedFile, InputError> {
    let text =
        std::str::from_utf8(bytes).map_err(|e| InputError::malformed(FileFormat::Json, e))?;
    parse_json_str(text)
}

/// Decode JSON from an in-memory string.
pub fn parse_json_str(input: &str) -> Result<ParsedFile, InputError> {
    let trimmed = input.trim_start_matches('\u{feff}').trim();
    if trimmed.is_empty() {
        return Err(InputError::EmptyFile);
    }

    // First try parsing as a single JSON value (array or object).
    let values = match serde_json::from_str::<Value>(trimmed) {
        Ok(Value::Array(items)) => items,
        Ok(v @ Value::Object(_)) => vec![v],
        Ok(_) => {
            return Err(InputError::malformed(
                FileFormat::Json,
                "json must be an object, an array of objects, or NDJSON",
            ));
        }
        // Fall back to NDJSON.
        Err(_) => parse_ndjson_lines(trimmed)?,
    };

    collect_rows(&values)
}

fn parse_ndjson_lines(input: &str) -> Result<Vec<Value>, InputError> {
    let mut values = Vec::new();
    for (i, line) in input.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let v = serde_json::from_str::<Value>(line).map_err(|e| {
            InputError::malformed(
                FileFormat::Json,
                format!("invalid ndjson at line {}: {e}", i + 1),
            )
        })?;
        values.push(v);
    }
    Ok(values)
}

fn collect_rows(values: &[Value]) -> Result<ParsedFile, InputError> {
    let mut headers: Vec<String> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut rows: Vec<Vec<String>> = Vec::with_capacity(values.len());

    for (idx0, v) in values.iter().enumerate() {
        let obj: &Map<String, Value> = v.as_object().ok_or_else(|| {
            InputError::malformed(
                FileFormat::Json,
                format!("row {} is not a json object", idx0 + 1),
            )
        })?;

        let mut row = vec![String::new(); headers.len()];
        for (key, value) in obj {
            let idx = *positions.entry(key.clone()).or_insert_with(|| {
                headers.push(key.clone());
                headers.len() - 1
            });
            if idx >= row.len() {
                row.resize(idx + 1, String::new());
            }
            row[idx] = cell_text(value);
        }
        rows.push(row);
    }

    // Earlier rows are padded to the final header width here.
    Ok(ParsedFile::new(headers, rows))
}

fn cell_text(v: &Value) -> String {
    match v {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(_) | Value::Object(_) => v.to_string(),
    }
}
