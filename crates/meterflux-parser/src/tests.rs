use std::fs;
use std::path::PathBuf;

use crate::errors::ParserError;
use crate::model::{format_timestamp, Delimiter};
use crate::registry::{parse_with_parsers, ReadingsParser};
use crate::{parse_readings, MeterReadingsV1Parser};

const FORMAT: &str = MeterReadingsV1Parser::FORMAT;

fn fixture(path: &str) -> String {
    let base = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    let full_path = base.join("tests/data").join(path);
    fs::read_to_string(&full_path)
        .unwrap_or_else(|err| panic!("failed to read fixture {}: {}", full_path.display(), err))
}

#[test]
fn parses_daily_gas_export_with_header() {
    let content = fixture("gas_daily.csv");
    let parsed = parse_readings(FORMAT, &content).expect("gas parse failed");

    assert_eq!(parsed.format, FORMAT);
    assert_eq!(parsed.delimiter, Delimiter::Comma);
    assert_eq!(
        parsed.header.as_deref(),
        Some(&["timestamp".to_string(), "value".to_string()][..])
    );
    assert_eq!(parsed.len(), 5);
    assert_eq!(format_timestamp(parsed.first().unwrap()), "2023-01-01T00:00:00");
    assert_eq!(format_timestamp(parsed.last().unwrap()), "2023-01-05T00:00:00");
    assert!((parsed.readings[1].value - 1523.9).abs() < 1e-9);
}

#[test]
fn parses_semicolon_export_with_decimal_comma() {
    let content = fixture("water_semicolon.csv");
    let parsed = parse_readings(FORMAT, &content).expect("water parse failed");

    assert_eq!(parsed.delimiter, Delimiter::Semicolon);
    assert_eq!(parsed.len(), 3);
    assert!((parsed.readings[0].value - 312.5).abs() < 1e-9);
    assert!((parsed.readings[2].value - 1324.75).abs() < 1e-9);
    assert_eq!(format_timestamp(parsed.first().unwrap()), "2023-03-01T00:00:00");
}

#[test]
fn rfc3339_timestamps_are_normalised_to_utc() {
    let content = fixture("electricity_rfc3339.csv");
    let parsed = parse_readings(FORMAT, &content).expect("electricity parse failed");

    assert!(parsed.header.is_none());
    assert_eq!(parsed.len(), 4);
    assert_eq!(format_timestamp(parsed.first().unwrap()), "2023-05-31T22:00:00");
    assert_eq!(format_timestamp(parsed.last().unwrap()), "2023-05-31T22:45:00");
}

#[test]
fn readings_are_sorted_by_timestamp() {
    let content = fixture("pv_unsorted.csv");
    let parsed = parse_readings(FORMAT, &content).expect("pv parse failed");

    let timestamps: Vec<String> = parsed
        .readings
        .iter()
        .map(|r| format_timestamp(r.timestamp))
        .collect();
    assert_eq!(
        timestamps,
        [
            "2023-07-01T12:00:00",
            "2023-07-02T12:00:00",
            "2023-07-03T12:00:00"
        ]
    );
    assert!((parsed.readings[0].value - 3.2).abs() < 1e-9);
}

#[test]
fn byte_order_mark_is_ignored() {
    let content = "\u{feff}timestamp,value\n2023-01-01 00:00,1\n";
    let parsed = parse_readings(FORMAT, content).expect("bom parse failed");
    assert_eq!(parsed.len(), 1);
    assert_eq!(parsed.header.as_ref().map(|h| h[0].as_str()), Some("timestamp"));
}

#[test]
fn rejects_unknown_format_tag() {
    let err = parse_readings("toa5", "2023-01-01,1\n").unwrap_err();
    assert!(matches!(err, ParserError::UnsupportedFormat { ref format } if format == "toa5"));
}

#[test]
fn rejects_single_column_file() {
    let err = parse_readings(FORMAT, "2023-01-01\n2023-01-02\n").unwrap_err();
    assert!(matches!(err, ParserError::FormatMismatch { .. }), "got {err}");
}

#[test]
fn invalid_timestamp_after_first_row_names_the_line() {
    let content = "timestamp,value\n2023-01-01,1\nyesterday,2\n";
    let err = parse_readings(FORMAT, content).unwrap_err();
    match err {
        ParserError::DataRow {
            line_index, message, ..
        } => {
            assert_eq!(line_index, 3);
            assert!(message.contains("yesterday"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn missing_value_is_rejected() {
    let content = "2023-01-01,1\n2023-01-02,\n";
    let err = parse_readings(FORMAT, content).unwrap_err();
    assert!(
        matches!(err, ParserError::DataRow { line_index: 2, ref message, .. } if message == "missing value"),
        "got {err}"
    );
}

#[test]
fn non_finite_value_is_rejected() {
    let err = parse_readings(FORMAT, "2023-01-01,NaN\n").unwrap_err();
    assert!(err.to_string().contains("not a finite number"), "got {err}");
}

#[test]
fn duplicate_timestamps_are_rejected() {
    let content = "2023-01-01,1\n2023-01-02,2\n2023-01-01,3\n";
    let err = parse_readings(FORMAT, content).unwrap_err();
    match err {
        ParserError::DataRow {
            line_index, message, ..
        } => {
            assert_eq!(line_index, 3);
            assert!(message.contains("first seen on line 1"), "got {message}");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn header_only_file_has_no_data() {
    let err = parse_readings(FORMAT, "timestamp,value\n").unwrap_err();
    assert!(matches!(err, ParserError::EmptyData { .. }));

    let err = parse_readings(FORMAT, "\n\n").unwrap_err();
    assert!(matches!(err, ParserError::EmptyData { .. }));
}

#[test]
fn parse_with_parsers_dispatches_on_format_tag() {
    struct AlwaysEmpty;

    impl ReadingsParser for AlwaysEmpty {
        fn format(&self) -> &'static str {
            "always_empty"
        }

        fn parse(&self, _content: &str) -> Result<crate::ParsedReadings, ParserError> {
            Err(ParserError::EmptyData {
                parser: "ALWAYS_EMPTY",
            })
        }
    }

    let readings_v1 = MeterReadingsV1Parser;
    let always_empty = AlwaysEmpty;
    let parsers: [&dyn ReadingsParser; 2] = [&readings_v1, &always_empty];

    let err = parse_with_parsers("always_empty", "2023-01-01,1\n", &parsers).unwrap_err();
    assert!(matches!(err, ParserError::EmptyData { parser: "ALWAYS_EMPTY" }));

    let parsed = parse_with_parsers(FORMAT, "2023-01-01,1\n", &parsers).expect("v1 parse");
    assert_eq!(parsed.len(), 1);
}
