//! Database connection management

#![allow(clippy::result_large_err)]

use crate::errors::{from_rusqlite, Result};
use crate::migrations::apply_migrations;
use rusqlite::Connection;
use std::path::Path;

/// Open a SQLite database at the given path
pub fn open<P: AsRef<Path>>(path: P) -> Result<Connection> {
    Connection::open(path).map_err(from_rusqlite)
}

/// Open an in-memory SQLite database (for testing)
pub fn open_in_memory() -> Result<Connection> {
    Connection::open_in_memory().map_err(from_rusqlite)
}

/// Configure a connection: foreign keys on, WAL journal
pub fn configure(conn: &Connection) -> Result<()> {
    // journal_mode returns a row, so it cannot go through `execute`
    conn.execute_batch("PRAGMA foreign_keys = ON; PRAGMA journal_mode = WAL;")
        .map_err(from_rusqlite)?;
    Ok(())
}

/// Open, configure and migrate a database in one step
///
/// Creates the file and any missing parent directory when absent.
///
/// # Errors
///
/// Returns an `Io` error if the parent directory cannot be created, and a
/// `Persistence` or `ConstraintViolation` error from opening or migrating.
pub fn open_and_migrate<P: AsRef<Path>>(path: P) -> Result<Connection> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .map_err(|e| crate::errors::io_error("create_db_dir", e))?;
    }
    let mut conn = open(path)?;
    configure(&conn)?;
    apply_migrations(&mut conn)?;
    Ok(conn)
}
