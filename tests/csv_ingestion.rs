use bronze_ingest::config::IngestionOptions;
use bronze_ingest::error::{IngestError, InputError};
use bronze_ingest::ingestion::csv::{parse_csv, parse_csv_from_reader};
use bronze_ingest::ingestion::{parse, FileFormat};
use bronze_ingest::processing::prepare;
use bronze_ingest::registry::ResourceConfig;
use bronze_ingest::types::ManualValues;

fn fixture() -> Vec<u8> {
    std::fs::read("tests/fixtures/orders.csv").unwrap()
}

#[test]
fn parse_csv_keeps_raw_headers_and_text_cells() {
    let pf = parse(&fixture(), FileFormat::Csv).unwrap();
    assert_eq!(pf.headers, vec!["Sipariş No", "Müşteri", "Tutar", "MUSTERI "]);
    assert_eq!(pf.row_count(), 3);
    assert_eq!(pf.rows[0], vec!["TY-1001", "Ayşe", "150.50", "Ayse Y."]);
}

#[test]
fn colliding_headers_keep_one_column_with_the_later_value() {
    let config = ResourceConfig::new(FileFormat::Csv, Vec::new());
    let rows = prepare(
        &fixture(),
        &config,
        &ManualValues::new(),
        &IngestionOptions::default(),
    )
    .unwrap();

    assert_eq!(rows.columns, vec!["siparis_no", "musteri", "tutar"]);
    assert_eq!(rows.row_count(), 3);
    assert_eq!(rows.get(0, "musteri"), Some("Ayse Y."));
    assert_eq!(rows.get(2, "musteri"), Some("Zeynep A."));
    assert_eq!(rows.get(1, "tutar"), Some("75.00"));
}

#[test]
fn header_only_csv_is_empty() {
    assert!(matches!(
        parse(b"id,amount\n", FileFormat::Csv),
        Err(InputError::EmptyFile)
    ));
}

#[test]
fn invalid_utf8_is_malformed() {
    let err = parse_csv(b"id\n\xff\xfe\n").unwrap_err();
    assert!(matches!(err, InputError::MalformedFile { .. }), "{err}");
}

#[test]
fn custom_reader_supports_semicolon_exports() {
    let data = "Sipariş No;Tutar\nTY-1;150,50\n";
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(b';')
        .from_reader(data.as_bytes());
    let pf = parse_csv_from_reader(&mut rdr).unwrap();
    assert_eq!(pf.headers, vec!["Sipariş No", "Tutar"]);
    assert_eq!(pf.rows[0], vec!["TY-1", "150,50"]);
}

#[test]
fn symbol_only_header_blocks_preparation() {
    let config = ResourceConfig::new(FileFormat::Csv, Vec::new());
    let err = prepare(
        b"id,%%%\n1,2\n",
        &config,
        &ManualValues::new(),
        &IngestionOptions::default(),
    )
    .unwrap_err();
    match err {
        IngestError::Validation(v) => assert_eq!(v.violations().len(), 1),
        other => panic!("expected validation error, got {other}"),
    }
}
