#![allow(clippy::unwrap_used, clippy::expect_used)]

use archivist_core::annotations::{
    deprecate_annotation, list_annotations, save_annotation, DEFAULT_ANCHOR_SOURCE,
};
use archivist_core::calendar::to_timestamp;
use archivist_core::errors::{ArchiveError, ExErrorKind};
use archivist_core::ingest::{ingest, IngestRequest, NormalizedRow};
use archivist_core::model::{
    AnnotationDraft, AnnotationQuery, AnnotationStatus, BarBucket, BarFilter, NewBar, Ohlcv,
    StatusFilter, TradeDayKey,
};
use archivist_core::store::SessionStore;
use archivist_store::db::configure;
use archivist_store::migrations::apply_migrations;
use archivist_store::SqliteStore;
use chrono::NaiveDate;
use rusqlite::Connection;

fn setup_test_db() -> Connection {
    let mut conn = Connection::open_in_memory().expect("in-memory database");
    configure(&conn).unwrap();
    apply_migrations(&mut conn).unwrap();
    conn
}

fn jan(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
}

fn at(day: u32, hour: u32, minute: u32) -> i64 {
    to_timestamp(jan(day).and_hms_opt(hour, minute, 0).unwrap())
}

fn row(timestamp: i64, close: f64, volume: Option<f64>) -> NormalizedRow {
    NormalizedRow {
        timestamp,
        open: 17000.25,
        high: 17010.5,
        low: 16990.75,
        close,
        volume,
        raw: Some(r#"{"time":"x"}"#.to_string()),
    }
}

fn request(file: &str) -> IngestRequest {
    IngestRequest::new("MNQ", "1m", "tradingview", file)
}

fn count(conn: &Connection, table: &str) -> i64 {
    conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |r| r.get(0))
        .unwrap()
}

#[test]
fn test_upsert_trade_day_returns_same_id() {
    let conn = setup_test_db();
    let mut store = SqliteStore::new(&conn);
    let key = TradeDayKey::new("MNQ", jan(8), "tradingview");

    let (first, created_first) = store.upsert_trade_day(&key).unwrap();
    let (second, created_second) = store.upsert_trade_day(&key).unwrap();

    assert!(created_first);
    assert!(!created_second);
    assert_eq!(first.id, second.id);
    assert_eq!(second.session_date, jan(8));
    assert_eq!(store.find_trade_day(&key).unwrap(), Some(first));
    assert_eq!(
        store
            .find_trade_day(&TradeDayKey::new("MNQ", jan(9), "tradingview"))
            .unwrap(),
        None
    );
}

#[test]
fn test_ingest_round_trip_preserves_values() {
    let conn = setup_test_db();
    let mut store = SqliteStore::new(&conn);
    let rows = vec![
        row(at(7, 15, 0), 17001.125, Some(42.0)),
        row(at(8, 13, 0), 17002.0, None),
    ];

    let report = ingest(&mut store, &rows, &request("a.csv")).unwrap();
    assert_eq!(report.inserted, 2);
    assert_eq!(report.anchors_created, 1);

    let bars = store
        .query_bars(&BarFilter::new("MNQ", "tradingview").on(jan(8)))
        .unwrap();
    assert_eq!(bars.len(), 2);
    assert_eq!(bars[0].ohlcv.close, 17001.125);
    assert_eq!(bars[0].ohlcv.volume, Some(42.0));
    assert_eq!(bars[1].ohlcv.volume, None);
    assert_eq!(bars[0].session_date, Some(jan(8)));
    assert_eq!(bars[0].raw.as_deref(), Some(r#"{"time":"x"}"#));
    assert_eq!(bars[0].timeframe, "1m");
}

#[test]
fn test_reingest_converges() {
    let conn = setup_test_db();
    let mut store = SqliteStore::new(&conn);
    let rows = vec![
        row(at(8, 9, 0), 1.0, Some(1.0)),
        row(at(8, 14, 30), 2.0, Some(2.0)),
        row(at(8, 15, 0), 3.0, None),
    ];

    let first = ingest(&mut store, &rows, &request("a.csv")).unwrap();
    let second = ingest(&mut store, &rows, &request("a.csv")).unwrap();

    assert_eq!(first.inserted, 3);
    assert_eq!(second.inserted, 0);
    assert_eq!(second.skipped, 3);
    assert_eq!(count(&conn, "bars"), 3);
    assert_eq!(count(&conn, "trade_days"), 2);
}

#[test]
fn test_reingest_negative_zero_is_duplicate() {
    let conn = setup_test_db();
    let mut store = SqliteStore::new(&conn);
    let mut signed = row(at(8, 10, 0), -0.0, Some(-0.0));
    signed.low = -0.0;

    let first = ingest(&mut store, &[signed.clone()], &request("a.csv")).unwrap();
    let second = ingest(&mut store, &[signed], &request("a.csv")).unwrap();

    assert_eq!(first.inserted, 1);
    assert_eq!(second.skipped, 1);
    assert_eq!(second.conflicts, 0);
    assert!(second.conflict_details.is_empty());
    assert_eq!(count(&conn, "bars"), 1);
}

#[test]
fn test_sunday_morning_row_gets_sunday_anchor() {
    let conn = setup_test_db();
    let mut store = SqliteStore::new(&conn);

    let report = ingest(
        &mut store,
        &[row(at(7, 9, 0), 17000.0, Some(5.0))],
        &request("a.csv"),
    )
    .unwrap();

    assert_eq!(report.inserted, 1);
    assert_eq!(report.rejected, 0);
    assert_eq!(report.anchors_created, 1);
    let sunday = store
        .find_trade_day(&TradeDayKey::new("MNQ", jan(7), "tradingview"))
        .unwrap();
    assert!(sunday.is_some());
    let bars = store
        .query_bars(&BarFilter::new("MNQ", "tradingview").on(jan(7)))
        .unwrap();
    assert_eq!(bars.len(), 1);
    assert_eq!(bars[0].session_date, Some(jan(7)));
}

#[test]
fn test_conflict_leaves_stored_bar() {
    let conn = setup_test_db();
    let mut store = SqliteStore::new(&conn);
    let ts = at(8, 10, 0);

    ingest(&mut store, &[row(ts, 100.50, None)], &request("a.csv")).unwrap();
    let report = ingest(&mut store, &[row(ts, 100.50001, None)], &request("b.csv")).unwrap();

    assert_eq!(report.conflicts, 1);
    let (anchor, _) = store
        .upsert_trade_day(&TradeDayKey::new("MNQ", jan(8), "tradingview"))
        .unwrap();
    let stored = store
        .find_bar(
            &BarBucket::TradeDay {
                trade_day_id: anchor.id,
            },
            ts,
        )
        .unwrap()
        .unwrap();
    assert_eq!(stored.ohlcv.close, 100.50);
}

#[test]
fn test_saturday_abort_keeps_earlier_rows() {
    let conn = setup_test_db();
    let mut store = SqliteStore::new(&conn);
    let rows = vec![
        row(at(12, 9, 0), 1.0, None),
        row(at(13, 9, 0), 2.0, None),
        row(at(12, 10, 0), 3.0, None),
    ];

    let err = ingest(&mut store, &rows, &request("sat.csv")).unwrap_err();

    assert!(matches!(err, ArchiveError::SaturdayData { row: 2, .. }));
    assert_eq!(count(&conn, "bars"), 1);
}

#[test]
fn test_halted_bars_have_no_anchor_and_dedupe_by_symbol_source() {
    let conn = setup_test_db();
    let mut store = SqliteStore::new(&conn);
    let ts = at(9, 14, 10);

    let report = ingest(&mut store, &[row(ts, 5.0, None)], &request("h.csv")).unwrap();
    assert_eq!(report.halted, 1);
    assert_eq!(report.anchors_created, 0);

    let other_source = IngestRequest::new("MNQ", "1m", "ninjatrader", "h.csv");
    let report = ingest(&mut store, &[row(ts, 6.0, None)], &other_source).unwrap();
    assert_eq!(report.inserted, 1, "halt bucket is per source");

    let report = ingest(&mut store, &[row(ts, 7.0, None)], &request("h2.csv")).unwrap();
    assert_eq!(report.conflicts, 1);

    let hidden = store
        .query_bars(&BarFilter::new("MNQ", "tradingview").on(jan(9)))
        .unwrap();
    assert!(hidden.is_empty());
    let shown = store
        .query_bars(&BarFilter::new("MNQ", "tradingview").on(jan(9)).with_halt(true))
        .unwrap();
    assert_eq!(shown.len(), 1);
    assert!(shown[0].halted);
    assert_eq!(shown[0].trade_day_id, None);
    assert_eq!(shown[0].session_date, None);
}

#[test]
fn test_query_bars_date_range() {
    let conn = setup_test_db();
    let mut store = SqliteStore::new(&conn);
    let rows = vec![
        row(at(8, 9, 0), 1.0, None),
        row(at(9, 9, 0), 2.0, None),
        row(at(10, 9, 0), 3.0, None),
        row(at(10, 16, 0), 4.0, None),
    ];
    ingest(&mut store, &rows, &request("w.csv")).unwrap();

    let mid = store
        .query_bars(&BarFilter::new("MNQ", "tradingview").between(jan(9), jan(10)))
        .unwrap();
    let closes: Vec<_> = mid.iter().map(|b| b.ohlcv.close).collect();
    assert_eq!(closes, vec![2.0, 3.0]);

    let everything = store
        .query_bars(&BarFilter::new("MNQ", "tradingview"))
        .unwrap();
    assert_eq!(everything.len(), 4);
}

#[test]
fn test_duplicate_insert_is_constraint_violation() {
    let conn = setup_test_db();
    let mut store = SqliteStore::new(&conn);
    let (day, _) = store
        .upsert_trade_day(&TradeDayKey::new("MNQ", jan(8), "tradingview"))
        .unwrap();
    let bar = NewBar {
        trade_day_id: Some(day.id),
        symbol: "MNQ".to_string(),
        source: "tradingview".to_string(),
        timeframe: "1m".to_string(),
        timestamp: at(8, 9, 0),
        ohlcv: Ohlcv {
            open: 1.0,
            high: 1.0,
            low: 1.0,
            close: 1.0,
            volume: None,
        },
        raw: None,
    };

    store.insert_bar(&bar).unwrap();
    let err = store.insert_bar(&bar).unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::ConstraintViolation);
    assert_eq!(err.timestamp(), Some(at(8, 9, 0)));
}

#[test]
fn test_supersede_is_atomic_in_sqlite() {
    let conn = setup_test_db();
    let mut store = SqliteStore::new(&conn);

    let a = save_annotation(
        &mut store,
        &AnnotationDraft::observation("MNQ", jan(8), "A").with_tags(["gap", "gap "]),
        DEFAULT_ANCHOR_SOURCE,
        10,
    )
    .unwrap();
    let b = save_annotation(
        &mut store,
        &AnnotationDraft::observation("MNQ", jan(8), "B").superseding(a),
        DEFAULT_ANCHOR_SOURCE,
        20,
    )
    .unwrap();

    let stored_a = store.get_annotation(a).unwrap().unwrap();
    assert_eq!(stored_a.status, AnnotationStatus::Superseded);
    assert_eq!(stored_a.tags, vec!["gap"]);

    // Second supersede of A must fail and leave no trace, including the new anchor
    let before_annotations = count(&conn, "day_annotations");
    let before_anchors = count(&conn, "trade_days");
    let err = save_annotation(
        &mut store,
        &AnnotationDraft::observation("MNQ", jan(11), "C").superseding(a),
        DEFAULT_ANCHOR_SOURCE,
        30,
    )
    .unwrap_err();
    assert!(matches!(err, ArchiveError::SupersedeTargetInactive { .. }));
    assert_eq!(count(&conn, "day_annotations"), before_annotations);
    assert_eq!(count(&conn, "trade_days"), before_anchors);

    let query = AnnotationQuery::new("MNQ", jan(8), jan(8));
    let active = list_annotations(&store, &query).unwrap();
    assert_eq!(active.iter().map(|x| x.id).collect::<Vec<_>>(), vec![b]);
    let all = list_annotations(&store, &query.with_status(StatusFilter::All)).unwrap();
    assert_eq!(all.iter().map(|x| x.id).collect::<Vec<_>>(), vec![a, b]);
}

#[test]
fn test_atomically_rolls_back_on_error() {
    let conn = setup_test_db();
    let mut store = SqliteStore::new(&conn);

    let result: archivist_core::Result<()> = store.atomically(|s| {
        s.upsert_trade_day(&TradeDayKey::new("MNQ", jan(8), "tradingview"))?;
        Err(ArchiveError::invalid_input("abort"))
    });

    assert!(result.is_err());
    assert_eq!(count(&conn, "trade_days"), 0);
}

#[test]
fn test_deprecate_and_list_by_status() {
    let conn = setup_test_db();
    let mut store = SqliteStore::new(&conn);
    let id = save_annotation(
        &mut store,
        &AnnotationDraft::observation("MNQ", jan(8), "old idea"),
        DEFAULT_ANCHOR_SOURCE,
        1,
    )
    .unwrap();

    deprecate_annotation(&mut store, id).unwrap();

    let query = AnnotationQuery::new("MNQ", jan(1), jan(31));
    assert!(list_annotations(&store, &query).unwrap().is_empty());
    let deprecated = list_annotations(
        &store,
        &query.with_status(StatusFilter::Only(AnnotationStatus::Deprecated)),
    )
    .unwrap();
    assert_eq!(deprecated.len(), 1);
    assert_eq!(deprecated[0].content, "old idea");
}

#[test]
fn test_foreign_keys_are_enforced() {
    let conn = setup_test_db();
    let err = conn
        .execute(
            "INSERT INTO day_annotations (trade_day_id, annotation_type, content, provenance, created_at)
             VALUES (999, 'observation', 'x', 'manual', 1)",
            [],
        )
        .unwrap_err();
    assert!(err.to_string().contains("FOREIGN KEY"));
}
