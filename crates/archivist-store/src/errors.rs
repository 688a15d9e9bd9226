//! Error handling for archivist-store
//!
//! Store failures are `ExError` values; these helpers classify them.

use archivist_core::errors::{ExError, ExErrorKind};

/// Result type alias using ExError
pub type Result<T> = std::result::Result<T, ExError>;

/// Create a migration error
pub fn migration_error(migration_id: &str, reason: &str) -> ExError {
    ExError::new(ExErrorKind::Persistence)
        .with_op("migration")
        .with_entity_id(migration_id)
        .with_message(format!("Migration {} failed: {}", migration_id, reason))
}

/// Create a checksum mismatch error
pub fn checksum_mismatch(migration_id: &str, expected: &str, actual: &str) -> ExError {
    ExError::new(ExErrorKind::ConstraintViolation)
        .with_op("migration_checksum")
        .with_entity_id(migration_id)
        .with_message(format!(
            "Checksum mismatch for migration {}: expected {}, got {}",
            migration_id, expected, actual
        ))
}

/// Create a database error from rusqlite::Error
///
/// Uniqueness and foreign-key failures are reported as constraint
/// violations; everything else is a persistence failure.
pub fn from_rusqlite(err: rusqlite::Error) -> ExError {
    let kind = match &err {
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            ExErrorKind::ConstraintViolation
        }
        _ => ExErrorKind::Persistence,
    };
    ExError::new(kind)
        .with_op("sqlite")
        .with_message(err.to_string())
}

/// Create an IO error
pub fn io_error(operation: &str, err: std::io::Error) -> ExError {
    ExError::new(ExErrorKind::Io)
        .with_op(operation.to_string())
        .with_message(err.to_string())
}

/// Create an error for a CSV read failure at a 1-based data row
pub fn csv_error(file: &str, row: Option<usize>, err: &csv::Error) -> ExError {
    let mut ex = ExError::new(ExErrorKind::MalformedInput)
        .with_op("read_rows")
        .with_file(file)
        .with_message(err.to_string());
    if let Some(row) = row {
        ex = ex.with_row(row);
    }
    ex
}

/// Create a configuration error
pub fn config_error(reason: impl Into<String>) -> ExError {
    ExError::new(ExErrorKind::Config)
        .with_op("config")
        .with_message(reason)
}

/// Create an error for a stored value that no longer parses
pub fn corrupt_row(table: &str, key: &str, reason: impl std::fmt::Display) -> ExError {
    ExError::new(ExErrorKind::Persistence)
        .with_op("decode_row")
        .with_entity_id(format!("{}:{}", table, key))
        .with_message(format!("Stored {} row {} is unreadable: {}", table, key, reason))
}
