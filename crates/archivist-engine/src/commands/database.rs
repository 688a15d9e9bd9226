//! Database lifecycle commands

#![allow(clippy::result_large_err)]

use std::path::Path;

use archivist_core::{log_op_end, log_op_error, log_op_start};
use archivist_store::db::open_and_migrate;
use archivist_store::errors::Result;
use archivist_store::migrations::applied_migrations;
use rusqlite::Connection;
use serde::Serialize;

/// State of a database after `database_init`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatabaseStatus {
    pub db_path: String,
    /// Applied migration ids, oldest first
    pub migrations: Vec<String>,
}

/// Open a database ready for commands, migrating it if needed
///
/// # Errors
///
/// Returns an `Io` error if the parent directory cannot be created, and a
/// `Persistence` or `ConstraintViolation` error from opening or migrating.
pub fn database_open(path: &Path) -> Result<Connection> {
    tracing::debug!(db_path = %path.display(), "opening database");
    open_and_migrate(path)
}

/// Create or upgrade the schema; idempotent
///
/// # Errors
///
/// Same as [`database_open`].
pub fn database_init(path: &Path) -> Result<DatabaseStatus> {
    log_op_start!("database_init", db_path = %path.display());
    let start = std::time::Instant::now();

    let status = database_init_impl(path).map_err(|e| {
        log_op_error!(
            "database_init",
            e.clone(),
            duration_ms = start.elapsed().as_millis() as u64
        );
        e
    })?;

    log_op_end!(
        "database_init",
        duration_ms = start.elapsed().as_millis() as u64,
        migrations = status.migrations.len()
    );

    Ok(status)
}

fn database_init_impl(path: &Path) -> Result<DatabaseStatus> {
    let conn = database_open(path)?;
    let migrations = applied_migrations(&conn)?
        .into_iter()
        .map(|m| m.migration_id)
        .collect();
    Ok(DatabaseStatus {
        db_path: path.display().to_string(),
        migrations,
    })
}
