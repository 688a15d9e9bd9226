//! Canonical schema constants for structured logging and events
//!
//! These constants keep field names identical across the core, store and
//! engine layers so log consumers can filter on them.

// Canonical field keys for structured logging
pub const FIELD_COMPONENT: &str = "component";
pub const FIELD_OP: &str = "op";
pub const FIELD_EVENT: &str = "event";
pub const FIELD_DURATION_MS: &str = "duration_ms";
pub const FIELD_RUN_ID: &str = "run_id";

// Entity identifiers
pub const FIELD_SYMBOL: &str = "symbol";
pub const FIELD_SOURCE: &str = "source";
pub const FIELD_SESSION_DATE: &str = "session_date";
pub const FIELD_TIMESTAMP: &str = "timestamp";
pub const FIELD_ANNOTATION_ID: &str = "annotation_id";

// Ingestion counters
pub const FIELD_INSERTED: &str = "inserted";
pub const FIELD_SKIPPED: &str = "skipped";
pub const FIELD_CONFLICTS: &str = "conflicts";
pub const FIELD_REJECTED: &str = "rejected";

// Error fields
pub const FIELD_ERR_KIND: &str = "err.kind";
pub const FIELD_ERR_CODE: &str = "err.code";

// Canonical event names
pub const EVENT_START: &str = "start";
pub const EVENT_END: &str = "end";
pub const EVENT_END_ERROR: &str = "end_error";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constants_accessibility() {
        assert!(!FIELD_COMPONENT.is_empty());
        assert!(!FIELD_OP.is_empty());
        assert!(!FIELD_RUN_ID.is_empty());
        assert!(!EVENT_START.is_empty());
        assert!(!EVENT_END.is_empty());
        assert!(!EVENT_END_ERROR.is_empty());
    }

    #[test]
    fn test_event_names_are_distinct() {
        assert_ne!(EVENT_START, EVENT_END);
        assert_ne!(EVENT_START, EVENT_END_ERROR);
        assert_ne!(EVENT_END, EVENT_END_ERROR);
    }

    #[test]
    fn test_error_fields_are_namespaced() {
        assert!(FIELD_ERR_KIND.starts_with("err."));
        assert!(FIELD_ERR_CODE.starts_with("err."));
    }
}
