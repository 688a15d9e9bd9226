//! Ingestion command handler with boundary logging.
//!
//! `ingest_file` reads a CSV export through a source schema, runs the core
//! ingestion pipeline against SQLite and records the attempt in the
//! `ingest_runs` ledger.
//!
//! ## Logging Ownership
//!
//! The engine layer owns lifecycle logging for ingestion:
//! - `log_op_start!` at entry
//! - `log_op_end!` on success, with the report counts
//! - `log_op_error!` on failure
//!
//! The pipeline itself logs one `warn!` per conflict and `debug!` details.

#![allow(clippy::result_large_err)]

use std::path::Path;

use archivist_core::errors::ExError;
use archivist_core::ingest::{ingest, IngestReport, IngestRequest};
use archivist_core::{log_op_end, log_op_error, log_op_start};
use archivist_core_types::RunId;
use archivist_store::errors::Result;
use archivist_store::source::read_rows;
use archivist_store::{runs, SourceSchema, SqliteStore};
use rusqlite::Connection;
use serde::Serialize;

use super::now;

/// Result of one ingestion run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestOutcome {
    pub run_id: RunId,
    #[serde(flatten)]
    pub report: IngestReport,
}

/// Ingest one CSV file
///
/// ## Arguments
///
/// - `path`: CSV file to read
/// - `symbol`, `timeframe`, `source`: what the rows belong to
/// - `schema`: column mapping for `source`
/// - `conn`: Database connection
///
/// ## Errors
///
/// - `Io` / `MalformedInput`: the file cannot be read or a row cannot be
///   normalized; nothing is written
/// - `SaturdayData`: a Saturday row aborts the batch; earlier rows stay
/// - `InvalidInput`: empty symbol, timeframe or source
/// - `Persistence`: Database error
///
/// Every error carries the run id; the ledger row is closed as `failed`.
pub fn ingest_file(
    path: &Path,
    symbol: &str,
    timeframe: &str,
    source: &str,
    schema: &SourceSchema,
    conn: &Connection,
) -> Result<IngestOutcome> {
    log_op_start!(
        "ingest_file",
        symbol = symbol,
        source = source,
        file = %path.display()
    );
    let start = std::time::Instant::now();

    let result = ingest_file_impl(path, symbol, timeframe, source, schema, conn).map_err(|e| {
        log_op_error!(
            "ingest_file",
            e.clone(),
            duration_ms = start.elapsed().as_millis() as u64
        );
        e
    })?;

    log_op_end!(
        "ingest_file",
        duration_ms = start.elapsed().as_millis() as u64,
        run_id = result.run_id.as_str(),
        inserted = result.report.inserted,
        skipped = result.report.skipped,
        conflicts = result.report.conflicts,
        rejected = result.report.rejected
    );

    Ok(result)
}

fn ingest_file_impl(
    path: &Path,
    symbol: &str,
    timeframe: &str,
    source: &str,
    schema: &SourceSchema,
    conn: &Connection,
) -> Result<IngestOutcome> {
    let request = IngestRequest::new(symbol, timeframe, source, path.display().to_string());
    let run_id = RunId::new();
    runs::start_run(conn, &run_id, &request, now())?;

    match run_batch(path, schema, &request, conn) {
        Ok(report) => {
            runs::complete_run(conn, &run_id, &report, now())?;
            Ok(IngestOutcome { run_id, report })
        }
        Err(err) => {
            if let Err(ledger_err) = runs::fail_run(conn, &run_id, err.code(), now()) {
                // The batch error is the one worth reporting
                tracing::debug!(
                    run_id = run_id.as_str(),
                    error = %ledger_err,
                    "failed to close run as failed"
                );
            }
            Err(err.with_run_id(run_id))
        }
    }
}

fn run_batch(
    path: &Path,
    schema: &SourceSchema,
    request: &IngestRequest,
    conn: &Connection,
) -> Result<IngestReport> {
    let rows = read_rows(path, schema)?;
    tracing::debug!(rows = rows.len(), file = %request.file, "rows normalized");

    let mut store = SqliteStore::new(conn);
    ingest(&mut store, &rows, request).map_err(ExError::from)
}
