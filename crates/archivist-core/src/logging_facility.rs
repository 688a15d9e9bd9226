//! Structured logging facility
//!
//! - Single initialization point via `init(profile)`
//! - Structured macros (`log_op_start!`, `log_op_end!`, `log_op_error!`)
//! - Test capture mode for deterministic assertions
//!
//! # Usage
//!
//! ```rust
//! use archivist_core::logging_facility::{init, Profile};
//!
//! init(Profile::Development);
//! ```
//!
//! The engine layer owns operation boundaries (start/end/end_error). Core and
//! store code only emit `tracing::debug!` details and `tracing::warn!` for
//! conflicts, so each operation logs exactly one start and one end.

pub mod init;
pub mod macros;
pub mod test_capture;

pub use init::{init, Profile};
pub use test_capture::{init_test_capture, CapturedEvent, TestCapture};
