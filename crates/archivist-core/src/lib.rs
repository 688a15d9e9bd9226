//! Archivist Core - trade-day calendar, ingestion and annotation kernel
//!
//! This crate provides:
//! - The trade-day calendar resolver (weekly open/close, daily halt)
//! - Domain models for anchors, bars and annotations
//! - The `SessionStore` boundary plus an in-memory implementation
//! - The idempotent ingestion pipeline and its report
//! - The append-only annotation versioning engine
//! - The error facility and structured logging facility shared by all crates

pub mod annotations;
pub mod calendar;
pub mod errors;
pub mod ingest;
pub mod logging_facility;
pub mod model;
pub mod store;

#[doc(hidden)]
pub use archivist_core_types as core_types;

// Re-export commonly used types
pub use calendar::{resolve, InvalidReason, Resolution};
pub use errors::{ArchiveError, ExError, ExErrorKind, Result};
pub use ingest::{ingest, IngestReport, IngestRequest, NormalizedRow};
pub use model::{Annotation, AnnotationDraft, AnnotationQuery, Bar, BarFilter, TradeDay};
pub use store::{MemoryStore, SessionStore};
