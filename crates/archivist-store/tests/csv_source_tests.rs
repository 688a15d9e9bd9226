#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::io::Write;

use archivist_core::calendar::to_timestamp;
use archivist_core::errors::ExErrorKind;
use archivist_store::source::{
    read_rows, read_rows_from, ColumnNames, SourceSchema, TimestampFormat,
};
use chrono::NaiveDate;
use tempfile::NamedTempFile;

fn local(day: u32, hour: u32, minute: u32) -> i64 {
    to_timestamp(
        NaiveDate::from_ymd_opt(2024, 1, day)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap(),
    )
}

fn write_csv(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn test_tradingview_export_with_offsets() {
    let file = write_csv(
        "time,open,high,low,close,Volume\n\
         2024-01-07T15:00:00-08:00,17000,17010.5,16995,17005.25,120\n\
         2024-01-07T15:01:00-08:00,17005.25,17006,17001,17002,\n",
    );

    let rows = read_rows(file.path(), &SourceSchema::tradingview()).unwrap();

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].timestamp, local(7, 15, 0));
    assert_eq!(rows[0].high, 17010.5);
    assert_eq!(rows[0].volume, Some(120.0));
    assert_eq!(rows[1].timestamp, local(7, 15, 1));
    assert_eq!(rows[1].volume, None, "empty volume is NULL, not zero");

    let raw: serde_json::Value = serde_json::from_str(rows[0].raw.as_deref().unwrap()).unwrap();
    assert_eq!(raw["close"], "17005.25");
    assert_eq!(raw["Volume"], "120");
}

#[test]
fn test_tradingview_without_volume_column() {
    let csv = "time,open,high,low,close\n2024-01-08 09:30:00,1,2,0.5,1.5\n";
    let rows = read_rows_from(csv.as_bytes(), "inline.csv", &SourceSchema::tradingview()).unwrap();
    assert_eq!(rows[0].timestamp, local(8, 9, 30));
    assert_eq!(rows[0].volume, None);
}

#[test]
fn test_headers_match_case_insensitively() {
    let csv = "Time,Open,High,Low,Close,VOLUME\n1704704400,1,2,0.5,1.5,3\n";
    let rows = read_rows_from(csv.as_bytes(), "caps.csv", &SourceSchema::tradingview()).unwrap();
    assert_eq!(rows[0].timestamp, 1_704_704_400);
    assert_eq!(rows[0].volume, Some(3.0));
}

#[test]
fn test_custom_schema_with_pattern() {
    let schema = SourceSchema {
        time_column: ColumnNames::new(["Date"]),
        timestamp_format: TimestampFormat::Pattern("%m/%d/%Y %H:%M".to_string()),
        open: ColumnNames::new(["O"]),
        high: ColumnNames::new(["H"]),
        low: ColumnNames::new(["L"]),
        close: ColumnNames::new(["C"]),
        volume: Some(ColumnNames::new(["V"])),
    };
    let csv = "Date,O,H,L,C,V\n01/08/2024 10:15,1,2,0.5,1.5,7\n";

    let rows = read_rows_from(csv.as_bytes(), "custom.csv", &schema).unwrap();

    assert_eq!(rows[0].timestamp, local(8, 10, 15));
    assert_eq!(rows[0].volume, Some(7.0));
}

#[test]
fn test_bad_timestamp_names_row_and_file() {
    let csv = "time,open,high,low,close\n\
               2024-01-08 09:30:00,1,2,0.5,1.5\n\
               yesterday,1,2,0.5,1.5\n";

    let err = read_rows_from(csv.as_bytes(), "broken.csv", &SourceSchema::tradingview())
        .unwrap_err();

    assert_eq!(err.kind(), ExErrorKind::MalformedInput);
    assert_eq!(err.row(), Some(2));
    assert_eq!(err.file(), Some("broken.csv"));
    assert!(err.message().contains("yesterday"));
}

#[test]
fn test_bad_price_is_malformed() {
    let csv = "time,open,high,low,close\n2024-01-08 09:30:00,1,two,0.5,1.5\n";
    let err = read_rows_from(csv.as_bytes(), "p.csv", &SourceSchema::tradingview()).unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::MalformedInput);
    assert!(err.message().contains("high"));
}

#[test]
fn test_missing_required_column() {
    let csv = "time,open,high,low\n2024-01-08 09:30:00,1,2,0.5\n";
    let err = read_rows_from(csv.as_bytes(), "m.csv", &SourceSchema::tradingview()).unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::MalformedInput);
    assert_eq!(err.row(), None);
    assert!(err.message().contains("close"));
}

#[test]
fn test_missing_file_is_io_error() {
    let err = read_rows("/definitely/not/here.csv", &SourceSchema::tradingview()).unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::Io);
}

#[test]
fn test_header_only_file_yields_no_rows() {
    let rows = read_rows_from(
        "time,open,high,low,close\n".as_bytes(),
        "empty.csv",
        &SourceSchema::tradingview(),
    )
    .unwrap();
    assert!(rows.is_empty());
}
