//! Migration framework
//!
//! Provides:
//! - Embedded SQL migrations applied in order
//! - Idempotent application tracked in `schema_version`
//! - Checksum verification of already-applied migrations

mod checksums;
mod embedded;
mod runner;

pub use checksums::compute_checksum;
pub use runner::{applied_migrations, apply_migrations, AppliedMigration};
