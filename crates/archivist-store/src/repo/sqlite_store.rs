//! SQLite session store
//!
//! Implements `SessionStore` over the tables created by migration 001.
//! Session dates are stored as `YYYY-MM-DD` text so range filters compare
//! lexically; tags are a JSON array.

#![allow(clippy::result_large_err)]

use std::error::Error as StdError;

use archivist_core::calendar::start_of_day;
use archivist_core::errors::{ExError, ExErrorKind, Result as CoreResult};
use archivist_core::model::{
    Annotation, AnnotationId, AnnotationQuery, AnnotationRecord, AnnotationStatus, Bar,
    BarBucket, BarFilter, BarId, NewBar, Ohlcv, TradeDay, TradeDayKey,
};
use archivist_core::store::{SessionStore, StoreResult};
use chrono::NaiveDate;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::errors::from_rusqlite;

const DATE_FORMAT: &str = "%Y-%m-%d";

const BAR_COLUMNS: &str = "b.id, b.trade_day_id, t.session_date, b.symbol, b.source, b.timeframe,
     b.timestamp, b.open, b.high, b.low, b.close, b.volume, b.halted, b.raw_json";

const ANNOTATION_COLUMNS: &str = "a.id, a.trade_day_id, t.symbol, t.session_date, a.annotation_type,
     a.content, a.tags, a.provenance, a.created_at, a.supersedes_id, a.status";

/// Session store backed by a SQLite connection
///
/// The connection must already be migrated.
pub struct SqliteStore<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    pub fn connection(&self) -> &'a Connection {
        self.conn
    }

    /// All anchors for a symbol, ordered by session date then source
    pub fn list_trade_days(&self, symbol: &str) -> StoreResult<Vec<TradeDay>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, symbol, session_date, source FROM trade_days
                 WHERE symbol = ?1 ORDER BY session_date, source",
            )
            .map_err(from_rusqlite)?;
        let rows = stmt
            .query_map([symbol], trade_day_from_row)
            .map_err(from_rusqlite)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(from_rusqlite)?;
        Ok(rows)
    }
}

fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

fn conversion_error(
    idx: usize,
    err: impl Into<Box<dyn StdError + Send + Sync>>,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, err.into())
}

fn date_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<NaiveDate> {
    let text: String = row.get(idx)?;
    NaiveDate::parse_from_str(&text, DATE_FORMAT).map_err(|e| conversion_error(idx, e))
}

fn parsed_at<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: std::str::FromStr<Err = String>,
{
    let text: String = row.get(idx)?;
    text.parse().map_err(|e: String| conversion_error(idx, e))
}

fn trade_day_from_row(row: &Row<'_>) -> rusqlite::Result<TradeDay> {
    Ok(TradeDay {
        id: row.get(0)?,
        symbol: row.get(1)?,
        session_date: date_at(row, 2)?,
        source: row.get(3)?,
    })
}

fn bar_from_row(row: &Row<'_>) -> rusqlite::Result<Bar> {
    let session_date: Option<String> = row.get(2)?;
    let session_date = session_date
        .map(|text| NaiveDate::parse_from_str(&text, DATE_FORMAT))
        .transpose()
        .map_err(|e| conversion_error(2, e))?;
    Ok(Bar {
        id: row.get(0)?,
        trade_day_id: row.get(1)?,
        session_date,
        symbol: row.get(3)?,
        source: row.get(4)?,
        timeframe: row.get(5)?,
        timestamp: row.get(6)?,
        ohlcv: Ohlcv {
            open: row.get(7)?,
            high: row.get(8)?,
            low: row.get(9)?,
            close: row.get(10)?,
            volume: row.get(11)?,
        },
        halted: row.get::<_, i64>(12)? == 1,
        raw: row.get(13)?,
    })
}

fn annotation_from_row(row: &Row<'_>) -> rusqlite::Result<Annotation> {
    let tags: String = row.get(6)?;
    let tags: Vec<String> = serde_json::from_str(&tags).map_err(|e| conversion_error(6, e))?;
    Ok(Annotation {
        id: row.get(0)?,
        trade_day_id: row.get(1)?,
        symbol: row.get(2)?,
        session_date: date_at(row, 3)?,
        annotation_type: parsed_at(row, 4)?,
        content: row.get(5)?,
        tags,
        provenance: parsed_at(row, 7)?,
        created_at: row.get(8)?,
        supersedes_id: row.get(9)?,
        status: parsed_at(row, 10)?,
    })
}

impl SessionStore for SqliteStore<'_> {
    fn upsert_trade_day(&mut self, key: &TradeDayKey) -> StoreResult<(TradeDay, bool)> {
        let date = format_date(key.session_date);
        let changed = self
            .conn
            .execute(
                "INSERT OR IGNORE INTO trade_days (symbol, session_date, source) VALUES (?1, ?2, ?3)",
                params![key.symbol, date, key.source],
            )
            .map_err(from_rusqlite)?;

        let trade_day = self
            .conn
            .query_row(
                "SELECT id, symbol, session_date, source FROM trade_days
                 WHERE symbol = ?1 AND session_date = ?2 AND source = ?3",
                params![key.symbol, date, key.source],
                trade_day_from_row,
            )
            .map_err(from_rusqlite)?;

        Ok((trade_day, changed == 1))
    }

    fn find_trade_day(&self, key: &TradeDayKey) -> StoreResult<Option<TradeDay>> {
        self.conn
            .query_row(
                "SELECT id, symbol, session_date, source FROM trade_days
                 WHERE symbol = ?1 AND session_date = ?2 AND source = ?3",
                params![key.symbol, format_date(key.session_date), key.source],
                trade_day_from_row,
            )
            .optional()
            .map_err(from_rusqlite)
    }

    fn find_bar(&self, bucket: &BarBucket, timestamp: i64) -> StoreResult<Option<Bar>> {
        let result = match bucket {
            BarBucket::TradeDay { trade_day_id } => self.conn.query_row(
                &format!(
                    "SELECT {} FROM bars b LEFT JOIN trade_days t ON t.id = b.trade_day_id
                     WHERE b.trade_day_id = ?1 AND b.timestamp = ?2",
                    BAR_COLUMNS
                ),
                params![trade_day_id, timestamp],
                bar_from_row,
            ),
            BarBucket::Halt { symbol, source } => self.conn.query_row(
                &format!(
                    "SELECT {} FROM bars b LEFT JOIN trade_days t ON t.id = b.trade_day_id
                     WHERE b.halted = 1 AND b.symbol = ?1 AND b.source = ?2 AND b.timestamp = ?3",
                    BAR_COLUMNS
                ),
                params![symbol, source, timestamp],
                bar_from_row,
            ),
        };
        result.optional().map_err(from_rusqlite)
    }

    fn insert_bar(&mut self, bar: &NewBar) -> StoreResult<BarId> {
        self.conn
            .execute(
                "INSERT INTO bars (trade_day_id, symbol, source, timeframe, timestamp,
                                   open, high, low, close, volume, halted, raw_json)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                params![
                    bar.trade_day_id,
                    bar.symbol,
                    bar.source,
                    bar.timeframe,
                    bar.timestamp,
                    bar.ohlcv.open,
                    bar.ohlcv.high,
                    bar.ohlcv.low,
                    bar.ohlcv.close,
                    bar.ohlcv.volume,
                    if bar.halted() { 1 } else { 0 },
                    bar.raw,
                ],
            )
            .map_err(|e| from_rusqlite(e).with_timestamp(bar.timestamp))?;
        Ok(self.conn.last_insert_rowid())
    }

    fn query_bars(&self, filter: &BarFilter) -> StoreResult<Vec<Bar>> {
        // Halted bars have no anchor, so they are matched on the calendar
        // date of their own timestamp
        let halt_start = filter.start.map(start_of_day);
        let halt_end = filter
            .end
            .and_then(|d| d.succ_opt())
            .map(start_of_day);

        let mut stmt = self
            .conn
            .prepare(&format!(
                "SELECT {} FROM bars b LEFT JOIN trade_days t ON t.id = b.trade_day_id
                 WHERE b.symbol = ?1 AND b.source = ?2
                   AND ((b.halted = 0
                         AND (?3 IS NULL OR t.session_date >= ?3)
                         AND (?4 IS NULL OR t.session_date <= ?4))
                     OR (?5 = 1 AND b.halted = 1
                         AND (?6 IS NULL OR b.timestamp >= ?6)
                         AND (?7 IS NULL OR b.timestamp < ?7)))
                 ORDER BY b.timestamp, b.id",
                BAR_COLUMNS
            ))
            .map_err(from_rusqlite)?;

        let rows = stmt
            .query_map(
                params![
                    filter.symbol,
                    filter.source,
                    filter.start.map(format_date),
                    filter.end.map(format_date),
                    if filter.include_halt { 1 } else { 0 },
                    halt_start,
                    halt_end,
                ],
                bar_from_row,
            )
            .map_err(from_rusqlite)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(from_rusqlite)?;
        Ok(rows)
    }

    fn get_annotation(&self, id: AnnotationId) -> StoreResult<Option<Annotation>> {
        self.conn
            .query_row(
                &format!(
                    "SELECT {} FROM day_annotations a JOIN trade_days t ON t.id = a.trade_day_id
                     WHERE a.id = ?1",
                    ANNOTATION_COLUMNS
                ),
                [id],
                annotation_from_row,
            )
            .optional()
            .map_err(from_rusqlite)
    }

    fn insert_annotation(&mut self, record: &AnnotationRecord) -> StoreResult<AnnotationId> {
        let tags = serde_json::to_string(&record.tags).map_err(|e| {
            ExError::new(ExErrorKind::Serialization)
                .with_op("insert_annotation")
                .with_message(e.to_string())
        })?;

        self.conn
            .execute(
                "INSERT INTO day_annotations (trade_day_id, annotation_type, content, tags,
                                              provenance, created_at, supersedes_id, status)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    record.trade_day_id,
                    record.annotation_type.as_str(),
                    record.content,
                    tags,
                    record.provenance.as_str(),
                    record.created_at,
                    record.supersedes_id,
                    record.status.as_str(),
                ],
            )
            .map_err(from_rusqlite)?;
        Ok(self.conn.last_insert_rowid())
    }

    fn update_annotation_status(
        &mut self,
        id: AnnotationId,
        expected: AnnotationStatus,
        new: AnnotationStatus,
    ) -> StoreResult<bool> {
        let changed = self
            .conn
            .execute(
                "UPDATE day_annotations SET status = ?1 WHERE id = ?2 AND status = ?3",
                params![new.as_str(), id, expected.as_str()],
            )
            .map_err(from_rusqlite)?;
        Ok(changed == 1)
    }

    fn query_annotations(&self, query: &AnnotationQuery) -> StoreResult<Vec<Annotation>> {
        let mut stmt = self
            .conn
            .prepare(&format!(
                "SELECT {} FROM day_annotations a JOIN trade_days t ON t.id = a.trade_day_id
                 WHERE t.symbol = ?1
                   AND t.session_date >= ?2 AND t.session_date <= ?3
                   AND (?4 IS NULL OR a.status = ?4)
                   AND (?5 IS NULL OR a.annotation_type = ?5)
                 ORDER BY t.session_date, a.created_at, a.id",
                ANNOTATION_COLUMNS
            ))
            .map_err(from_rusqlite)?;

        let rows = stmt
            .query_map(
                params![
                    query.symbol,
                    format_date(query.start),
                    format_date(query.end),
                    query.status.status().map(|s| s.as_str()),
                    query.annotation_type.map(|t| t.as_str()),
                ],
                annotation_from_row,
            )
            .map_err(from_rusqlite)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(from_rusqlite)?;
        Ok(rows)
    }

    fn atomically<T, F>(&mut self, f: F) -> CoreResult<T>
    where
        Self: Sized,
        F: FnOnce(&mut Self) -> CoreResult<T>,
    {
        let conn = self.conn;
        let tx = conn.unchecked_transaction().map_err(from_rusqlite)?;
        // Dropping `tx` on the error path rolls back
        let value = f(self)?;
        tx.commit().map_err(from_rusqlite)?;
        Ok(value)
    }
}
