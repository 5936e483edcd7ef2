//! HTML table decoding.
//!
//! The first `<table>` in the document is decoded. Its first `<tr>` is the header row; every
//! following `<tr>` is a data row. Both `<th>` and `<td>` count as cells. Rows of nested tables
//! are ignored, and cell text is whitespace-collapsed the way a browser renders it.

use scraper::{ElementRef, Html};

use crate::error::InputError;
use crate::types::ParsedFile;

use super::FileFormat;

/// Decode an HTML document into a [`ParsedFile`].
pub fn parse_html(bytes: &[u8]) -> Result<ParsedFile, InputError> {
    let text = std::str::from_utf8(bytes).map_err(|e| InputError::malformed(FileFormat::Html, e))?;
    parse_html_str(text)
}

/// Decode HTML from an in-memory string.
pub fn parse_html_str(input: &str) -> Result<ParsedFile, InputError> {
    let doc = Html::parse_document(input);

    let table = doc
        .tree
        .root()
        .descendants()
        .filter_map(ElementRef::wrap)
        .find(|e| e.value().name() == "table")
        .ok_or_else(|| InputError::malformed(FileFormat::Html, "no <table> element found"))?;

    let mut rows = table
        .descendants()
        .filter_map(ElementRef::wrap)
        .filter(|e| e.value().name() == "tr" && belongs_to(e, &table))
        .map(|tr| row_cells(&tr))
        .filter(|cells| !cells.is_empty());

    let headers = match rows.next() {
        Some(h) => h,
        None => return Err(InputError::EmptyFile),
    };
    let rows: Vec<Vec<String>> = rows.collect();

    Ok(ParsedFile::new(headers, rows))
}

/// `true` if the nearest enclosing `<table>` of `tr` is `table`.
fn belongs_to(tr: &ElementRef<'_>, table: &ElementRef<'_>) -> bool {
    tr.ancestors()
        .filter_map(ElementRef::wrap)
        .find(|e| e.value().name() == "table")
        .is_some_and(|owner| std::ptr::eq(owner.value(), table.value()))
}

fn row_cells(tr: &ElementRef<'_>) -> Vec<String> {
    tr.children()
        .filter_map(ElementRef::wrap)
        .filter(|c| matches!(c.value().name(), "td" | "th"))
        .map(|c| {
            let raw: String = c.text().collect();
            raw.split_whitespace().collect::<Vec<_>>().join(" ")
        })
        .collect()
}
