//! Ingest run ledger
//!
//! One `ingest_runs` row per ingestion attempt. The row is opened as
//! `running` before the first bar is written and closed as `completed` or
//! `failed`, so an aborted batch still leaves a trace of what was written.

#![allow(clippy::result_large_err)]

use std::fmt;
use std::str::FromStr;

use archivist_core::ingest::{IngestReport, IngestRequest};
use archivist_core_types::RunId;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;

use crate::errors::{corrupt_row, from_rusqlite, Result};

/// Lifecycle state of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Running => "running",
            RunStatus::Completed => "completed",
            RunStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RunStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "running" => Ok(RunStatus::Running),
            "completed" => Ok(RunStatus::Completed),
            "failed" => Ok(RunStatus::Failed),
            other => Err(format!("unknown run status '{}'", other)),
        }
    }
}

/// A row of `ingest_runs`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestRun {
    pub run_id: RunId,
    pub symbol: String,
    pub source: String,
    pub timeframe: String,
    pub file: String,
    pub started_at: i64,
    pub finished_at: Option<i64>,
    pub inserted: i64,
    pub skipped: i64,
    pub conflicts: i64,
    pub rejected: i64,
    pub status: RunStatus,
    pub error_code: Option<String>,
}

const RUN_COLUMNS: &str = "run_id, symbol, source, timeframe, file, started_at, finished_at,
     inserted, skipped, conflicts, rejected, status, error_code";

// Raw row; status is decoded outside the rusqlite closure
type RawRun = (IngestRun, String);

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<RawRun> {
    Ok((
        IngestRun {
            run_id: RunId::from_string(row.get(0)?),
            symbol: row.get(1)?,
            source: row.get(2)?,
            timeframe: row.get(3)?,
            file: row.get(4)?,
            started_at: row.get(5)?,
            finished_at: row.get(6)?,
            inserted: row.get(7)?,
            skipped: row.get(8)?,
            conflicts: row.get(9)?,
            rejected: row.get(10)?,
            status: RunStatus::Running,
            error_code: row.get(12)?,
        },
        row.get(11)?,
    ))
}

fn decode((mut run, status): RawRun) -> Result<IngestRun> {
    run.status = status
        .parse()
        .map_err(|e: String| corrupt_row("ingest_runs", run.run_id.as_str(), e))?;
    Ok(run)
}

/// Open a run in `running` state
pub fn start_run(
    conn: &Connection,
    run_id: &RunId,
    request: &IngestRequest,
    started_at: i64,
) -> Result<()> {
    conn.execute(
        "INSERT INTO ingest_runs (run_id, symbol, source, timeframe, file, started_at, status)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'running')",
        params![
            run_id.as_str(),
            request.symbol,
            request.source,
            request.timeframe,
            request.file,
            started_at
        ],
    )
    .map_err(from_rusqlite)?;
    Ok(())
}

/// Close a run as `completed` with its report counts
pub fn complete_run(
    conn: &Connection,
    run_id: &RunId,
    report: &IngestReport,
    finished_at: i64,
) -> Result<()> {
    conn.execute(
        "UPDATE ingest_runs
         SET status = 'completed', finished_at = ?2,
             inserted = ?3, skipped = ?4, conflicts = ?5, rejected = ?6
         WHERE run_id = ?1",
        params![
            run_id.as_str(),
            finished_at,
            report.inserted as i64,
            report.skipped as i64,
            report.conflicts as i64,
            report.rejected as i64,
        ],
    )
    .map_err(from_rusqlite)?;
    Ok(())
}

/// Close a run as `failed` with the stable code of the error that stopped it
pub fn fail_run(
    conn: &Connection,
    run_id: &RunId,
    error_code: &str,
    finished_at: i64,
) -> Result<()> {
    conn.execute(
        "UPDATE ingest_runs SET status = 'failed', finished_at = ?2, error_code = ?3
         WHERE run_id = ?1",
        params![run_id.as_str(), finished_at, error_code],
    )
    .map_err(from_rusqlite)?;
    Ok(())
}

pub fn get_run(conn: &Connection, run_id: &RunId) -> Result<Option<IngestRun>> {
    let raw = conn
        .query_row(
            &format!("SELECT {} FROM ingest_runs WHERE run_id = ?1", RUN_COLUMNS),
            [run_id.as_str()],
            run_from_row,
        )
        .optional()
        .map_err(from_rusqlite)?;
    raw.map(decode).transpose()
}

/// Most recent runs first, optionally for one symbol
pub fn list_runs(conn: &Connection, symbol: Option<&str>, limit: usize) -> Result<Vec<IngestRun>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {} FROM ingest_runs
             WHERE (?1 IS NULL OR symbol = ?1)
             ORDER BY started_at DESC, run_id DESC
             LIMIT ?2",
            RUN_COLUMNS
        ))
        .map_err(from_rusqlite)?;
    let raw = stmt
        .query_map(params![symbol, limit as i64], run_from_row)
        .map_err(from_rusqlite)?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(from_rusqlite)?;
    raw.into_iter().map(decode).collect()
}
