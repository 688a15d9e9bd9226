//! Domain model
//!
//! Three append-mostly entities: trade-day anchors, bars and annotations.
//! Anchors own bars and annotations through `trade_day_id`; nothing points
//! the other way.

pub mod annotation;
pub mod bar;
pub mod trade_day;

pub use annotation::{
    Annotation, AnnotationDraft, AnnotationId, AnnotationQuery, AnnotationRecord,
    AnnotationStatus, AnnotationType, Provenance, StatusFilter,
};
pub use bar::{Bar, BarBucket, BarFilter, BarId, NewBar, Ohlcv};
pub use trade_day::{TradeDay, TradeDayId, TradeDayKey};
