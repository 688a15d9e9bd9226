//! Command orchestration layer
//!
//! Each handler opens a `SqliteStore` over the caller's connection, runs the
//! core operation and owns the operation's start/end logging.

pub mod annotation;
pub mod database;
pub mod ingest;
pub mod read_tools;

/// Wall-clock seconds used for creation and ledger timestamps
pub(crate) fn now() -> i64 {
    chrono::Utc::now().timestamp()
}
