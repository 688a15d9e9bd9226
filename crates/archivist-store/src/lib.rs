//! Archivist Store - SQLite persistence and row sources
//!
//! Provides:
//! - Connection setup and embedded, checksummed migrations
//! - `SqliteStore`, the SQLite implementation of `SessionStore`
//! - Schema-driven CSV normalization into `NormalizedRow`s
//! - The ingest run ledger

pub mod db;
pub mod errors;
pub mod migrations;
pub mod repo;
pub mod runs;
pub mod source;

// Re-export key types
pub use errors::Result;
pub use repo::SqliteStore;
pub use source::SourceSchema;
