//! Archivist Engine - Orchestration layer
//!
//! Provides command handlers that coordinate the calendar, ingestion and
//! annotation logic in `archivist-core` with the SQLite persistence in
//! `archivist-store`, plus layered configuration loading.

pub mod commands;
pub mod config;

pub use config::ArchiveConfig;
