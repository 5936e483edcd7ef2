use bronze_ingest::error::InputError;
use bronze_ingest::ingestion::{parse, parse_declared, FileFormat};

#[test]
fn declared_tokens_map_to_formats() {
    for (token, format) in [
        ("excel", FileFormat::Excel),
        ("CSV", FileFormat::Csv),
        (" html ", FileFormat::Html),
        ("json", FileFormat::Json),
        ("Parquet", FileFormat::Parquet),
    ] {
        assert_eq!(token.parse::<FileFormat>().unwrap(), format, "token {token:?}");
    }
}

#[test]
fn unknown_token_fails_fast_without_sniffing() {
    // Valid CSV content does not rescue an unknown token.
    let err = parse_declared(b"id\n1\n", "xml").unwrap_err();
    assert!(matches!(err, InputError::UnsupportedFormat(ref t) if t == "xml"));
    assert!(matches!(
        parse_declared(b"id\n1\n", "tsv"),
        Err(InputError::UnsupportedFormat(_))
    ));
}

#[test]
fn declared_format_wins_over_content() {
    let json = br#"[{"id": 1}]"#;
    assert_eq!(parse_declared(json, "json").unwrap().headers, vec!["id"]);
    // The same bytes declared as html contain no table.
    assert!(matches!(
        parse(json, FileFormat::Html),
        Err(InputError::MalformedFile { .. })
    ));
}

#[test]
fn every_format_has_picker_extensions() {
    for format in FileFormat::ALL {
        assert!(!format.accepted_extensions().is_empty(), "{format}");
    }
    assert!(FileFormat::Html.accepted_extensions().contains(&"htm"));
}

#[test]
fn excel_decoder_follows_the_cargo_feature() {
    assert_eq!(FileFormat::Excel.has_decoder(), cfg!(feature = "excel"));
    if !cfg!(feature = "excel") {
        assert!(matches!(
            parse(b"PK", FileFormat::Excel),
            Err(InputError::UnsupportedFormat(_))
        ));
    }
}
