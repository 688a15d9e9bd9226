//! CSV row source
//!
//! Turns a CSV export into `NormalizedRow`s using a `SourceSchema`. Every
//! row is parsed before any is returned, so a malformed file never reaches
//! the pipeline half-read. Row numbers are 1-based and exclude the header.

#![allow(clippy::result_large_err)]

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use archivist_core::calendar::to_timestamp;
use archivist_core::errors::{ExError, ExErrorKind};
use archivist_core::NormalizedRow;
use chrono::{DateTime, NaiveDateTime};
use csv::StringRecord;

use super::schema::{ColumnNames, SourceSchema, TimestampFormat};
use crate::errors::{csv_error, io_error, Result};

const PLAIN_DATETIME: &str = "%Y-%m-%d %H:%M:%S";
const ISO_NO_OFFSET: &str = "%Y-%m-%dT%H:%M:%S";

fn malformed(file: &str, row: Option<usize>, reason: impl Into<String>) -> ExError {
    let mut ex = ExError::new(ExErrorKind::MalformedInput)
        .with_op("read_rows")
        .with_file(file)
        .with_message(reason);
    if let Some(row) = row {
        ex = ex.with_row(row);
    }
    ex
}

/// Read and normalize every row of a CSV file
///
/// # Errors
///
/// Returns an `Io` error if the file cannot be opened, and a
/// `MalformedInput` error naming the file and row for a missing column or
/// an unparsable cell.
pub fn read_rows<P: AsRef<Path>>(path: P, schema: &SourceSchema) -> Result<Vec<NormalizedRow>> {
    let path = path.as_ref();
    let file_name = path.display().to_string();
    let file = File::open(path).map_err(|e| io_error("open_csv", e).with_file(&file_name))?;
    read_rows_from(file, &file_name, schema)
}

/// Read and normalize every row from any reader
///
/// `file` is only used in error messages.
///
/// # Errors
///
/// Same as [`read_rows`].
pub fn read_rows_from<R: Read>(
    reader: R,
    file: &str,
    schema: &SourceSchema,
) -> Result<Vec<NormalizedRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader
        .headers()
        .map_err(|e| csv_error(file, None, &e))?
        .clone();
    let columns = HeaderMap::from_headers(&headers, schema, file)?;

    let mut rows = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let row_number = index + 1;
        let record = record.map_err(|e| csv_error(file, Some(row_number), &e))?;
        let row = normalize(&record, &headers, &columns, schema, file, row_number)?;
        rows.push(row);
    }

    tracing::debug!(file, rows = rows.len(), "csv rows normalized");
    Ok(rows)
}

/// Resolved column indexes for one file
struct HeaderMap {
    time: usize,
    open: usize,
    high: usize,
    low: usize,
    close: usize,
    volume: Option<usize>,
}

impl HeaderMap {
    fn from_headers(headers: &StringRecord, schema: &SourceSchema, file: &str) -> Result<Self> {
        let mut index: HashMap<String, usize> = HashMap::new();
        for (i, h) in headers.iter().enumerate() {
            index.entry(h.trim().to_ascii_lowercase()).or_insert(i);
        }

        let find = |names: &ColumnNames| -> Option<usize> {
            names
                .names()
                .iter()
                .find_map(|n| index.get(&n.trim().to_ascii_lowercase()).copied())
        };
        let require = |field: &str, names: &ColumnNames| -> Result<usize> {
            find(names).ok_or_else(|| {
                malformed(
                    file,
                    None,
                    format!("missing {} column (expected {})", field, names),
                )
            })
        };

        Ok(Self {
            time: require("time", &schema.time_column)?,
            open: require("open", &schema.open)?,
            high: require("high", &schema.high)?,
            low: require("low", &schema.low)?,
            close: require("close", &schema.close)?,
            volume: schema.volume.as_ref().and_then(find),
        })
    }
}

fn normalize(
    record: &StringRecord,
    headers: &StringRecord,
    columns: &HeaderMap,
    schema: &SourceSchema,
    file: &str,
    row: usize,
) -> Result<NormalizedRow> {
    let cell = |idx: usize| record.get(idx).unwrap_or("");

    let time = cell(columns.time);
    let timestamp = parse_timestamp(time, &schema.timestamp_format).ok_or_else(|| {
        malformed(
            file,
            Some(row),
            format!(
                "unparsable timestamp '{}' (format {})",
                time, schema.timestamp_format
            ),
        )
    })?;

    let price = |field: &str, idx: usize| -> Result<f64> {
        let text = cell(idx);
        match text.parse::<f64>() {
            Ok(value) if value.is_finite() => Ok(value),
            _ => Err(malformed(
                file,
                Some(row),
                format!("invalid {} price '{}'", field, text),
            )),
        }
    };

    let volume = match columns.volume.map(cell) {
        None | Some("") => None,
        Some(text) => match text.parse::<f64>() {
            Ok(value) if value.is_finite() => Some(value),
            _ => {
                return Err(malformed(
                    file,
                    Some(row),
                    format!("invalid volume '{}'", text),
                ))
            }
        },
    };

    Ok(NormalizedRow {
        timestamp,
        open: price("open", columns.open)?,
        high: price("high", columns.high)?,
        low: price("low", columns.low)?,
        close: price("close", columns.close)?,
        volume,
        raw: Some(raw_payload(headers, record)),
    })
}

/// The row as a JSON object of header to cell
fn raw_payload(headers: &StringRecord, record: &StringRecord) -> String {
    let map: serde_json::Map<String, serde_json::Value> = headers
        .iter()
        .zip(record.iter())
        .map(|(h, v)| (h.to_string(), serde_json::Value::String(v.to_string())))
        .collect();
    serde_json::Value::Object(map).to_string()
}

/// Parse a time cell into local epoch seconds
pub fn parse_timestamp(text: &str, format: &TimestampFormat) -> Option<i64> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    match format {
        TimestampFormat::Epoch => text.parse::<i64>().ok(),
        TimestampFormat::Iso8601 => parse_iso(text),
        TimestampFormat::Pattern(pattern) => NaiveDateTime::parse_from_str(text, pattern)
            .ok()
            .map(to_timestamp),
        TimestampFormat::Auto => text
            .parse::<i64>()
            .ok()
            .or_else(|| parse_iso(text))
            .or_else(|| {
                NaiveDateTime::parse_from_str(text, PLAIN_DATETIME)
                    .ok()
                    .map(to_timestamp)
            }),
    }
}

fn parse_iso(text: &str) -> Option<i64> {
    // Offsets are not applied: the wall clock as written is already local
    DateTime::parse_from_rfc3339(text)
        .ok()
        .map(|dt| to_timestamp(dt.naive_local()))
        .or_else(|| {
            NaiveDateTime::parse_from_str(text, ISO_NO_OFFSET)
                .ok()
                .map(to_timestamp)
        })
}
