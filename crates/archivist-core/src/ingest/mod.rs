//! Idempotent ingestion pipeline
//!
//! Classifies each normalized row against the calendar and the store:
//! inserted, skipped (bit-identical duplicate), conflict (same slot,
//! different values) or rejected (market closed). Saturday data and
//! unrepresentable timestamps abort the batch. Rows written before the
//! abort stay written; the batch is not a transaction.

pub mod report;

pub use report::{ConflictDetail, IngestReport, ReportReason};

use serde::{Deserialize, Serialize};

use crate::calendar::{self, InvalidReason, Resolution};
use crate::errors::{ArchiveError, Result};
use crate::model::{BarBucket, NewBar, Ohlcv, TradeDayKey};
use crate::store::SessionStore;

/// One bar as produced by a row source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRow {
    /// Local epoch seconds in the reference timezone
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: Option<f64>,
    /// Opaque source payload, stored verbatim
    pub raw: Option<String>,
}

impl NormalizedRow {
    /// Values as stored and compared; `-0.0` becomes `0.0`
    ///
    /// SQLite reads `-0.0` back as `0.0`, so a signed zero would never
    /// match its own stored copy under `Ohlcv::bit_eq`.
    pub fn ohlcv(&self) -> Ohlcv {
        Ohlcv {
            open: unsigned_zero(self.open),
            high: unsigned_zero(self.high),
            low: unsigned_zero(self.low),
            close: unsigned_zero(self.close),
            volume: self.volume.map(unsigned_zero),
        }
    }
}

fn unsigned_zero(value: f64) -> f64 {
    if value == 0.0 {
        0.0
    } else {
        value
    }
}

/// What a batch of rows belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestRequest {
    pub symbol: String,
    pub timeframe: String,
    pub source: String,
    /// Name reported in errors and conflict details
    pub file: String,
}

impl IngestRequest {
    pub fn new(
        symbol: impl Into<String>,
        timeframe: impl Into<String>,
        source: impl Into<String>,
        file: impl Into<String>,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            timeframe: timeframe.into(),
            source: source.into(),
            file: file.into(),
        }
    }

    fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("symbol", &self.symbol),
            ("timeframe", &self.timeframe),
            ("source", &self.source),
        ] {
            if value.trim().is_empty() {
                return Err(ArchiveError::invalid_input(format!(
                    "{} must not be empty",
                    name
                )));
            }
        }
        Ok(())
    }
}

/// Ingest a batch of rows into the store
///
/// # Errors
///
/// - `InvalidInput` for an empty symbol, timeframe or source
/// - `SaturdayData` at the first Saturday row; earlier rows remain stored
/// - `MalformedInput` for a timestamp outside the supported range
/// - `Storage` for any store failure, unchanged
pub fn ingest<S: SessionStore>(
    store: &mut S,
    rows: &[NormalizedRow],
    request: &IngestRequest,
) -> Result<IngestReport> {
    request.validate()?;

    let mut report = IngestReport::default();

    for (index, row) in rows.iter().enumerate() {
        let row_number = index + 1;

        let trade_day_id = match calendar::resolve(row.timestamp) {
            Resolution::Invalid(InvalidReason::Saturday) => {
                return Err(ArchiveError::SaturdayData {
                    timestamp: row.timestamp,
                    row: row_number,
                    file: request.file.clone(),
                });
            }
            Resolution::Invalid(InvalidReason::OutOfRange) => {
                return Err(ArchiveError::malformed(
                    &request.file,
                    row_number,
                    format!(
                        "timestamp {} is outside the supported date range",
                        row.timestamp
                    ),
                ));
            }
            Resolution::Invalid(InvalidReason::PostClose) => {
                let reason = ReportReason::PostClose;
                tracing::debug!(
                    symbol = %request.symbol,
                    timestamp = row.timestamp,
                    row = row_number,
                    reason = %reason,
                    "row rejected"
                );
                report.rejected += 1;
                report.conflict_details.push(ConflictDetail {
                    timestamp: row.timestamp,
                    row: row_number,
                    reason,
                    existing: None,
                    new: None,
                    file: request.file.clone(),
                });
                continue;
            }
            Resolution::Halted => None,
            Resolution::TradeDay(session_date) => {
                // Anchor exists even if this row turns out to conflict
                let key = TradeDayKey::new(&request.symbol, session_date, &request.source);
                let (trade_day, created) = store.upsert_trade_day(&key)?;
                if created {
                    report.anchors_created += 1;
                }
                Some(trade_day.id)
            }
        };

        let bar = NewBar {
            trade_day_id,
            symbol: request.symbol.clone(),
            source: request.source.clone(),
            timeframe: request.timeframe.clone(),
            timestamp: row.timestamp,
            ohlcv: row.ohlcv(),
            raw: row.raw.clone(),
        };
        let bucket: BarBucket = bar.bucket();
        if bucket.is_halt() {
            report.halted += 1;
        }

        match store.find_bar(&bucket, row.timestamp)? {
            None => {
                store.insert_bar(&bar)?;
                report.inserted += 1;
            }
            Some(existing) if existing.ohlcv.bit_eq(&bar.ohlcv) => {
                report.skipped += 1;
            }
            Some(existing) => {
                tracing::warn!(
                    symbol = %request.symbol,
                    source = %request.source,
                    timestamp = row.timestamp,
                    row = row_number,
                    file = %request.file,
                    existing_close = existing.ohlcv.close,
                    new_close = bar.ohlcv.close,
                    "bar conflict: OHLCV mismatch"
                );
                report.conflicts += 1;
                report.conflict_details.push(ConflictDetail {
                    timestamp: row.timestamp,
                    row: row_number,
                    reason: ReportReason::OhlcvMismatch,
                    existing: Some(existing.ohlcv),
                    new: Some(bar.ohlcv),
                    file: request.file.clone(),
                });
            }
        }
    }

    tracing::debug!(
        symbol = %request.symbol,
        file = %request.file,
        inserted = report.inserted,
        skipped = report.skipped,
        conflicts = report.conflicts,
        rejected = report.rejected,
        "batch classified"
    );

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::to_timestamp;
    use crate::store::MemoryStore;
    use chrono::NaiveDate;

    fn at(day: u32, hour: u32, minute: u32) -> i64 {
        to_timestamp(
            NaiveDate::from_ymd_opt(2024, 1, day)
                .unwrap()
                .and_hms_opt(hour, minute, 0)
                .unwrap(),
        )
    }

    fn row(timestamp: i64, close: f64) -> NormalizedRow {
        NormalizedRow {
            timestamp,
            open: 100.0,
            high: 101.0,
            low: 99.0,
            close,
            volume: Some(10.0),
            raw: None,
        }
    }

    fn request() -> IngestRequest {
        IngestRequest::new("MNQ", "1m", "tradingview", "bars.csv")
    }

    #[test]
    fn test_empty_batch() {
        let mut store = MemoryStore::new();
        let report = ingest(&mut store, &[], &request()).unwrap();
        assert_eq!(report, IngestReport::default());
    }

    #[test]
    fn test_rejects_empty_symbol() {
        let mut store = MemoryStore::new();
        let req = IngestRequest::new("  ", "1m", "tradingview", "bars.csv");
        let err = ingest(&mut store, &[row(at(8, 10, 0), 1.0)], &req).unwrap_err();
        assert!(matches!(err, ArchiveError::InvalidInput { .. }));
    }

    #[test]
    fn test_halted_rows_count_and_dedupe() {
        let mut store = MemoryStore::new();
        let rows = vec![row(at(8, 14, 30), 1.0)];

        let first = ingest(&mut store, &rows, &request()).unwrap();
        assert_eq!(first.inserted, 1);
        assert_eq!(first.halted, 1);
        assert_eq!(first.anchors_created, 0);

        let second = ingest(&mut store, &rows, &request()).unwrap();
        assert_eq!(second.skipped, 1);
        assert_eq!(second.halted, 1);
        assert_eq!(store.bar_count(), 1);
    }

    #[test]
    fn test_out_of_range_timestamp_is_malformed() {
        let mut store = MemoryStore::new();
        let err = ingest(&mut store, &[row(i64::MAX, 1.0)], &request()).unwrap_err();
        assert!(matches!(
            err,
            ArchiveError::MalformedInput { row: Some(1), .. }
        ));
    }

    #[test]
    fn test_ohlcv_drops_zero_sign() {
        let mut signed = row(at(8, 10, 0), -0.0);
        signed.volume = Some(-0.0);

        let ohlcv = signed.ohlcv();
        assert!(ohlcv.close.is_sign_positive());
        assert!(ohlcv.volume.unwrap().is_sign_positive());
        let mut unsigned = row(at(8, 10, 0), 0.0);
        unsigned.volume = Some(0.0);
        assert!(ohlcv.bit_eq(&unsigned.ohlcv()));
    }
}
