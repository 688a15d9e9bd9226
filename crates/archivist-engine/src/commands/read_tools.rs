//! Read-only query surface: bars, trade-day anchors and the run ledger.
//!
//! Nothing here writes. Reads log their boundaries like the write commands
//! so slow queries show up with a duration.

#![allow(clippy::result_large_err)]

use archivist_core::errors::{ArchiveError, ExError};
use archivist_core::model::{Bar, BarFilter, TradeDay, TradeDayKey};
use archivist_core::store::SessionStore;
use archivist_core::{log_op_end, log_op_error, log_op_start};
use archivist_core_types::RunId;
use archivist_store::errors::Result;
use archivist_store::runs::{self, IngestRun};
use archivist_store::SqliteStore;
use chrono::NaiveDate;
use rusqlite::Connection;

/// Default maximum rows for ledger listings
pub const DEFAULT_LIST_LIMIT: usize = 20;

/// Bars matching a filter, ordered by timestamp
///
/// Halted bars are only returned with `include_halt`, matched by the
/// calendar date of their timestamp.
///
/// ## Errors
///
/// - `InvalidInput`: start date after end date
/// - `Persistence`: Database error
pub fn bars_query(filter: &BarFilter, conn: &Connection) -> Result<Vec<Bar>> {
    log_op_start!(
        "bars_query",
        symbol = filter.symbol.as_str(),
        source = filter.source.as_str(),
        include_halt = filter.include_halt
    );
    let start = std::time::Instant::now();

    let bars = bars_query_impl(filter, conn).map_err(|e| {
        log_op_error!(
            "bars_query",
            e.clone(),
            duration_ms = start.elapsed().as_millis() as u64
        );
        e
    })?;

    log_op_end!(
        "bars_query",
        duration_ms = start.elapsed().as_millis() as u64,
        count = bars.len()
    );

    Ok(bars)
}

fn bars_query_impl(filter: &BarFilter, conn: &Connection) -> Result<Vec<Bar>> {
    if let (Some(start), Some(end)) = (filter.start, filter.end) {
        if start > end {
            return Err(ExError::from(ArchiveError::invalid_input(format!(
                "start date {} is after end date {}",
                start, end
            )))
            .with_op("bars_query"));
        }
    }
    SqliteStore::new(conn).query_bars(filter)
}

/// The anchor for (symbol, session date, source), if it exists
///
/// ## Errors
///
/// - `Persistence`: Database error
pub fn trade_day_get(
    symbol: &str,
    session_date: NaiveDate,
    source: &str,
    conn: &Connection,
) -> Result<Option<TradeDay>> {
    let key = TradeDayKey::new(symbol, session_date, source);
    SqliteStore::new(conn).find_trade_day(&key)
}

/// Every anchor of a symbol, ordered by session date
///
/// ## Errors
///
/// - `Persistence`: Database error
pub fn trade_days_list(symbol: &str, conn: &Connection) -> Result<Vec<TradeDay>> {
    SqliteStore::new(conn).list_trade_days(symbol)
}

/// Most recent ingestion runs first
///
/// ## Errors
///
/// - `Persistence`: Database error
pub fn runs_list(symbol: Option<&str>, limit: usize, conn: &Connection) -> Result<Vec<IngestRun>> {
    log_op_start!("runs_list", symbol = ?symbol, limit = limit);
    let start = std::time::Instant::now();

    let listed = runs::list_runs(conn, symbol, limit).map_err(|e| {
        log_op_error!(
            "runs_list",
            e.clone(),
            duration_ms = start.elapsed().as_millis() as u64
        );
        e
    })?;

    log_op_end!(
        "runs_list",
        duration_ms = start.elapsed().as_millis() as u64,
        count = listed.len()
    );

    Ok(listed)
}

/// One ingestion run by id
///
/// ## Errors
///
/// - `Persistence`: Database error
pub fn run_get(run_id: &RunId, conn: &Connection) -> Result<Option<IngestRun>> {
    runs::get_run(conn, run_id)
}
