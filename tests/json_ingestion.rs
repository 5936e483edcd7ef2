use bronze_ingest::error::InputError;
use bronze_ingest::ingestion::json::parse_json_str;
use bronze_ingest::ingestion::{parse, FileFormat};
use bronze_ingest::processing::transform;
use bronze_ingest::registry::ResourceConfig;
use bronze_ingest::types::ManualValues;

#[test]
fn json_array_headers_are_union_of_keys_in_first_seen_order() {
    let bytes = std::fs::read("tests/fixtures/orders.json").unwrap();
    let pf = parse(&bytes, FileFormat::Json).unwrap();

    assert_eq!(pf.headers, vec!["Sipariş No", "Tutar", "İade", "Kargo", "Not"]);
    assert_eq!(pf.row_count(), 3);
    assert_eq!(
        pf.rows[0],
        vec!["TY-1001", "150.5", "false", r#"{"firma":"Yurtiçi"}"#, ""]
    );
    // Explicit null and a missing key both surface as empty text.
    assert_eq!(pf.rows[1][3], "");
    assert_eq!(pf.rows[1][4], "");
    assert_eq!(pf.rows[2][4], "hediye paketi");
}

#[test]
fn ndjson_is_accepted() {
    let bytes = std::fs::read("tests/fixtures/orders.ndjson").unwrap();
    let pf = parse(&bytes, FileFormat::Json).unwrap();
    assert_eq!(pf.headers, vec!["id", "amount", "channel"]);
    assert_eq!(pf.rows[0], vec!["101", "50", ""]);
    assert_eq!(pf.rows[1], vec!["102", "75", "web"]);
}

#[test]
fn json_rows_transform_with_sanitized_headers() {
    let bytes = std::fs::read("tests/fixtures/orders.json").unwrap();
    let pf = parse(&bytes, FileFormat::Json).unwrap();
    let config = ResourceConfig::new(FileFormat::Json, Vec::new());
    let rows = transform(&pf, &ManualValues::new(), &config);
    assert_eq!(rows.columns, vec!["siparis_no", "tutar", "iade", "kargo", "not"]);
    assert_eq!(rows.get(1, "iade"), Some("true"));
}

#[test]
fn numeric_literals_are_stored_verbatim() {
    let pf = parse(
        br#"[{"id": 12345678901234567890123, "price": 19.90, "qty": 1e2}]"#,
        FileFormat::Json,
    )
    .unwrap();
    assert_eq!(pf.headers, vec!["id", "price", "qty"]);
    assert_eq!(pf.rows[0], vec!["12345678901234567890123", "19.90", "1e2"]);
}

#[test]
fn objects_without_keys_are_empty_file() {
    assert!(matches!(parse(b"[{}, {}]", FileFormat::Json), Err(InputError::EmptyFile)));
}

#[test]
fn empty_array_is_empty_file() {
    assert!(matches!(parse(b"[]", FileFormat::Json), Err(InputError::EmptyFile)));
    assert!(matches!(parse(b"  ", FileFormat::Json), Err(InputError::EmptyFile)));
}

#[test]
fn scalar_rows_are_malformed() {
    assert!(matches!(
        parse_json_str("[1, 2, 3]"),
        Err(InputError::MalformedFile { .. })
    ));
    assert!(matches!(
        parse_json_str("{\"id\": 1}\nnot json\n"),
        Err(InputError::MalformedFile { .. })
    ));
}
