// Integration tests for the migration framework

use archivist_core::errors::ExErrorKind;
use archivist_store::migrations::{applied_migrations, apply_migrations};
use rusqlite::Connection;

fn setup_test_db() -> Connection {
    Connection::open_in_memory().expect("Failed to create in-memory database")
}

#[test]
fn test_apply_migrations_on_empty_db() {
    let mut conn = setup_test_db();

    let result = apply_migrations(&mut conn);
    assert!(
        result.is_ok(),
        "Migrations should succeed: {:?}",
        result.err()
    );

    let tables = get_table_names(&conn);
    for expected_table in [
        "schema_version",
        "trade_days",
        "bars",
        "day_annotations",
        "ingest_runs",
    ] {
        assert!(
            tables.contains(&expected_table.to_string()),
            "Missing table: {}",
            expected_table
        );
    }
}

#[test]
fn test_migration_idempotency() {
    let mut conn = setup_test_db();
    apply_migrations(&mut conn).unwrap();

    let result = apply_migrations(&mut conn);
    assert!(result.is_ok(), "Re-running migrations should succeed");

    let version_count: i64 = conn
        .query_row("SELECT COUNT(*) FROM schema_version", [], |row| row.get(0))
        .unwrap();
    assert_eq!(version_count, 2, "Should still have exactly 2 migrations");
}

#[test]
fn test_checksums_are_recorded() {
    let mut conn = setup_test_db();
    apply_migrations(&mut conn).unwrap();

    let applied = applied_migrations(&conn).unwrap();
    let ids: Vec<_> = applied.iter().map(|m| m.migration_id.as_str()).collect();
    assert_eq!(ids, vec!["001_initial_schema", "002_ingest_runs"]);
    assert!(applied.iter().all(|m| m.checksum.len() == 64));
}

#[test]
fn test_checksum_mismatch_is_refused() {
    let mut conn = setup_test_db();
    apply_migrations(&mut conn).unwrap();

    conn.execute(
        "UPDATE schema_version SET checksum = ?1 WHERE migration_id = ?2",
        ["0000", "001_initial_schema"],
    )
    .unwrap();

    let err = apply_migrations(&mut conn).unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::ConstraintViolation);
    assert_eq!(err.code(), "ERR_CONSTRAINT_VIOLATION");
    assert!(err.message().contains("001_initial_schema"));
}

#[test]
fn test_partial_unique_indexes_exist() {
    let mut conn = setup_test_db();
    apply_migrations(&mut conn).unwrap();

    let mut stmt = conn
        .prepare("SELECT name FROM sqlite_master WHERE type = 'index' AND tbl_name = 'bars'")
        .unwrap();
    let names: Vec<String> = stmt
        .query_map([], |row| row.get(0))
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();

    assert!(names.contains(&"idx_bars_trade_day_timestamp".to_string()));
    assert!(names.contains(&"idx_bars_halt_timestamp".to_string()));
}

// Helper function to get all table names from the database
fn get_table_names(conn: &Connection) -> Vec<String> {
    let mut stmt = conn
        .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
        .unwrap();

    let tables = stmt
        .query_map([], |row| row.get(0))
        .unwrap()
        .collect::<Result<Vec<String>, _>>()
        .unwrap();

    tables
}
