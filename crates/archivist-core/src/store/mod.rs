//! Session store boundary
//!
//! The ingestion pipeline and the annotation engine reach persistence only
//! through [`SessionStore`]. Implementations report failures as [`ExError`]
//! values (normally of kind `Persistence`); callers propagate them unchanged.

pub mod memory;

pub use memory::MemoryStore;

use chrono::NaiveDate;

use crate::errors::{ExError, Result};
use crate::model::{
    Annotation, AnnotationId, AnnotationQuery, AnnotationRecord, AnnotationStatus, Bar,
    BarBucket, BarFilter, BarId, NewBar, TradeDay, TradeDayKey,
};

/// Result type for store operations
pub type StoreResult<T> = std::result::Result<T, ExError>;

/// Persistence operations needed by ingestion and annotations
pub trait SessionStore {
    /// Get or create the anchor for a key
    ///
    /// Returns the anchor and whether this call created it. Calling twice
    /// with the same key yields the same anchor id.
    fn upsert_trade_day(&mut self, key: &TradeDayKey) -> StoreResult<(TradeDay, bool)>;

    /// Look up an anchor without creating it
    fn find_trade_day(&self, key: &TradeDayKey) -> StoreResult<Option<TradeDay>>;

    /// Look up the bar stored in a bucket at a timestamp
    fn find_bar(&self, bucket: &BarBucket, timestamp: i64) -> StoreResult<Option<Bar>>;

    /// Insert a bar
    ///
    /// The caller has already checked the bucket; a uniqueness violation
    /// here is a store error.
    fn insert_bar(&mut self, bar: &NewBar) -> StoreResult<BarId>;

    /// Bars matching a filter, ordered by timestamp
    fn query_bars(&self, filter: &BarFilter) -> StoreResult<Vec<Bar>>;

    fn get_annotation(&self, id: AnnotationId) -> StoreResult<Option<Annotation>>;

    fn insert_annotation(&mut self, record: &AnnotationRecord) -> StoreResult<AnnotationId>;

    /// Compare-and-set an annotation's status
    ///
    /// Returns `false` without writing when the current status is not
    /// `expected` or the annotation does not exist.
    fn update_annotation_status(
        &mut self,
        id: AnnotationId,
        expected: AnnotationStatus,
        new: AnnotationStatus,
    ) -> StoreResult<bool>;

    /// Annotations matching symbol, date range, status and type
    ///
    /// Ordered by session_date, created_at, id. Tags are not applied here.
    fn query_annotations(&self, query: &AnnotationQuery) -> StoreResult<Vec<Annotation>>;

    /// Run `f` as one unit: either every write inside it lands or none does
    ///
    /// # Errors
    ///
    /// Returns the closure's error after rolling back, or a store error if
    /// the unit could not be started or committed.
    fn atomically<T, F>(&mut self, f: F) -> Result<T>
    where
        Self: Sized,
        F: FnOnce(&mut Self) -> Result<T>;
}

/// Calendar date an anchor-less (halted) bar is filed under for reads
pub fn halt_read_date(timestamp: i64) -> Option<NaiveDate> {
    crate::calendar::to_local(timestamp).map(|dt| dt.date())
}
