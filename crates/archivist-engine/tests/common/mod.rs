use std::path::PathBuf;

use archivist_core::calendar::to_timestamp;
use archivist_engine::commands::database::database_open;
use chrono::NaiveDate;
use rusqlite::Connection;
use tempfile::TempDir;

pub const HEADER: &str = "time,open,high,low,close,Volume";

/// A migrated on-disk database in a fresh temp dir
#[allow(dead_code)]
pub fn setup_db() -> (TempDir, Connection) {
    let temp_dir = TempDir::new().unwrap();
    let conn = database_open(&temp_dir.path().join("archive.db")).unwrap();
    (temp_dir, conn)
}

/// Write a CSV with the TradingView header and the given data lines
#[allow(dead_code)]
pub fn write_csv(dir: &TempDir, name: &str, lines: &[&str]) -> PathBuf {
    let path = dir.path().join(name);
    let mut content = String::from(HEADER);
    for line in lines {
        content.push('\n');
        content.push_str(line);
    }
    content.push('\n');
    std::fs::write(&path, content).unwrap();
    path
}

/// A date in January 2024 (7th = Sunday, 8th = Monday, 13th = Saturday)
#[allow(dead_code)]
pub fn jan(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
}

#[allow(dead_code)]
pub fn at(day: u32, hour: u32, minute: u32) -> i64 {
    to_timestamp(jan(day).and_hms_opt(hour, minute, 0).unwrap())
}
