use archivist_core::calendar::to_timestamp;
use archivist_core::NormalizedRow;
use chrono::NaiveDate;

/// A date in the first full week of January 2024 (7th = Sunday, 13th = Saturday)
#[allow(dead_code)]
pub fn jan(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
}

/// Local epoch seconds for a January 2024 wall-clock time
#[allow(dead_code)]
pub fn at(day: u32, hour: u32, minute: u32) -> i64 {
    to_timestamp(jan(day).and_hms_opt(hour, minute, 0).unwrap())
}

/// A bar row with fixed open/high/low and the given close
#[allow(dead_code)]
pub fn bar_row(timestamp: i64, close: f64, volume: Option<f64>) -> NormalizedRow {
    NormalizedRow {
        timestamp,
        open: 17000.0,
        high: 17010.0,
        low: 16990.0,
        close,
        volume,
        raw: Some(format!("{{\"time\":\"{}\",\"close\":\"{}\"}}", timestamp, close)),
    }
}
