//! Core types shared across the archivist crates
//!
//! This crate provides the small vocabulary used by both the error facility
//! and the logging facility:
//!
//! - **Correlation types**: `RunId` identifies one ingestion run
//! - **Schema constants**: canonical field keys and event names

pub mod correlation;
pub mod schema;

pub use correlation::RunId;
