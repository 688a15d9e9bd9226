use archivist_core_types::RunId;
use thiserror::Error;

use crate::model::{AnnotationId, AnnotationStatus};

/// Result type alias using ArchiveError
pub type Result<T> = std::result::Result<T, ArchiveError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// Every failure that crosses a crate boundary is classified by one of these
/// kinds. Each kind maps to a stable code used by the CLI exit path, the
/// ingest run ledger, and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExErrorKind {
    // Input
    InvalidInput,
    MalformedInput,

    // Calendar
    SaturdayData,

    // Annotations
    NotFound,
    SupersedeTargetInvalid,
    InvalidStatusTransition,
    InvariantViolation,

    // Integration/IO
    Config,
    Io,
    Serialization,
    Persistence,
    ConstraintViolation,

    // Internal
    Internal,
}

impl ExErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ExErrorKind::InvalidInput => "ERR_INVALID_INPUT",
            ExErrorKind::MalformedInput => "ERR_MALFORMED_INPUT",
            ExErrorKind::SaturdayData => "ERR_SATURDAY_DATA",
            ExErrorKind::NotFound => "ERR_NOT_FOUND",
            ExErrorKind::SupersedeTargetInvalid => "ERR_SUPERSEDE_TARGET_INVALID",
            ExErrorKind::InvalidStatusTransition => "ERR_INVALID_STATUS_TRANSITION",
            ExErrorKind::InvariantViolation => "ERR_INVARIANT_VIOLATION",
            ExErrorKind::Config => "ERR_CONFIG",
            ExErrorKind::Io => "ERR_IO",
            ExErrorKind::Serialization => "ERR_SERIALIZATION",
            ExErrorKind::Persistence => "ERR_PERSISTENCE",
            ExErrorKind::ConstraintViolation => "ERR_CONSTRAINT_VIOLATION",
            ExErrorKind::Internal => "ERR_INTERNAL",
        }
    }

    /// Whether an error of this kind aborts the whole ingestion batch
    pub fn is_batch_fatal(&self) -> bool {
        matches!(
            self,
            ExErrorKind::SaturdayData
                | ExErrorKind::MalformedInput
                | ExErrorKind::Persistence
                | ExErrorKind::Io
        )
    }
}

/// Canonical structured error type
///
/// Carries the classification plus enough context (operation, offending
/// timestamp, row number, source file) to point at the exact record that
/// stopped a batch.
#[derive(Debug, Clone)]
pub struct ExError {
    kind: ExErrorKind,
    op: Option<String>,
    entity_id: Option<String>,
    timestamp: Option<i64>,
    row: Option<usize>,
    file: Option<String>,
    run_id: Option<RunId>,
    message: String,
    source: Option<Box<ExError>>,
}

impl ExError {
    /// Create a new error with the specified kind
    pub fn new(kind: ExErrorKind) -> Self {
        Self {
            kind,
            op: None,
            entity_id: None,
            timestamp: None,
            row: None,
            file: None,
            run_id: None,
            message: String::new(),
            source: None,
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add entity ID context
    pub fn with_entity_id(mut self, id: impl Into<String>) -> Self {
        self.entity_id = Some(id.into());
        self
    }

    /// Add the offending bar timestamp
    pub fn with_timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Add the 1-based row number within the source file
    pub fn with_row(mut self, row: usize) -> Self {
        self.row = Some(row);
        self
    }

    /// Add the source file
    pub fn with_file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self
    }

    /// Add the ingestion run ID
    pub fn with_run_id(mut self, run_id: RunId) -> Self {
        self.run_id = Some(run_id);
        self
    }

    /// Add custom message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Add source error
    pub fn with_source(mut self, source: ExError) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Get the error kind
    pub fn kind(&self) -> ExErrorKind {
        self.kind
    }

    /// Get the stable error code
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    /// Get the operation context, if any
    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    /// Get the entity ID context, if any
    pub fn entity_id(&self) -> Option<&str> {
        self.entity_id.as_deref()
    }

    /// Get the offending timestamp, if any
    pub fn timestamp(&self) -> Option<i64> {
        self.timestamp
    }

    /// Get the offending row number, if any
    pub fn row(&self) -> Option<usize> {
        self.row
    }

    /// Get the source file, if any
    pub fn file(&self) -> Option<&str> {
        self.file.as_deref()
    }

    /// Get the ingestion run ID, if any
    pub fn run_id(&self) -> Option<&RunId> {
        self.run_id.as_ref()
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get the source error, if any
    pub fn source_error(&self) -> Option<&ExError> {
        self.source.as_deref()
    }
}

impl std::fmt::Display for ExError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.code())?;
        if let Some(op) = &self.op {
            write!(f, " in operation '{}'", op)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(entity_id) = &self.entity_id {
            write!(f, " (entity_id: {})", entity_id)?;
        }
        if let Some(timestamp) = self.timestamp {
            write!(f, " (timestamp: {})", timestamp)?;
        }
        if let Some(row) = self.row {
            write!(f, " (row: {})", row)?;
        }
        if let Some(file) = &self.file {
            write!(f, " (file: {})", file)?;
        }
        if let Some(source) = &self.source {
            write!(f, "; caused by {}", source)?;
        }
        Ok(())
    }
}

impl std::error::Error for ExError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

// ========== End Error Facility ==========

/// Domain error taxonomy for calendar, ingestion and annotation operations
#[derive(Error, Debug, Clone)]
pub enum ArchiveError {
    // ===== Calendar =====
    /// A bar dated Saturday reached the pipeline; the upstream export is broken
    #[error("Saturday trading data is invalid per session calendar: timestamp {timestamp} at row {row} of {file}")]
    SaturdayData {
        timestamp: i64,
        row: usize,
        file: String,
    },

    // ===== Input =====
    /// A row could not be normalized (unparsable timestamp, price, or shape)
    #[error("Malformed input{}: {reason}", location(.file, .row))]
    MalformedInput {
        file: Option<String>,
        row: Option<usize>,
        reason: String,
    },

    /// A caller-supplied argument failed validation
    #[error("Invalid input: {reason}")]
    InvalidInput { reason: String },

    // ===== Annotations =====
    /// Supersede target does not exist
    #[error("Cannot supersede annotation {annotation_id}: it does not exist")]
    SupersedeTargetNotFound { annotation_id: AnnotationId },

    /// Supersede target exists but is no longer active
    #[error("Cannot supersede annotation {annotation_id}: it is {status}, only active annotations can be superseded")]
    SupersedeTargetInactive {
        annotation_id: AnnotationId,
        status: AnnotationStatus,
    },

    /// Annotation not found
    #[error("Annotation not found: {annotation_id}")]
    AnnotationNotFound { annotation_id: AnnotationId },

    /// Status change not allowed from the annotation's current status
    #[error("Annotation {annotation_id} cannot move from {from} to {to}")]
    InvalidStatusTransition {
        annotation_id: AnnotationId,
        from: AnnotationStatus,
        to: AnnotationStatus,
    },

    /// A supersession chain revisits an annotation
    #[error("Supersession chain through annotation {annotation_id} forms a cycle")]
    SupersessionCycle { annotation_id: AnnotationId },

    // ===== Integration =====
    /// Serialization failure (tags, raw payloads, reports)
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// Store adapter failure, passed through unchanged
    #[error("{0}")]
    Storage(ExError),
}

fn location(file: &Option<String>, row: &Option<usize>) -> String {
    match (file, row) {
        (Some(file), Some(row)) => format!(" at row {} of {}", row, file),
        (Some(file), None) => format!(" in {}", file),
        (None, Some(row)) => format!(" at row {}", row),
        (None, None) => String::new(),
    }
}

impl ArchiveError {
    /// Shorthand for a malformed row inside a named file
    pub fn malformed(file: impl Into<String>, row: usize, reason: impl Into<String>) -> Self {
        ArchiveError::MalformedInput {
            file: Some(file.into()),
            row: Some(row),
            reason: reason.into(),
        }
    }

    /// Shorthand for an invalid argument
    pub fn invalid_input(reason: impl Into<String>) -> Self {
        ArchiveError::InvalidInput {
            reason: reason.into(),
        }
    }
}

impl From<ExError> for ArchiveError {
    fn from(err: ExError) -> Self {
        ArchiveError::Storage(err)
    }
}

impl From<serde_json::Error> for ArchiveError {
    fn from(err: serde_json::Error) -> Self {
        ArchiveError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<ArchiveError> for ExError {
    fn from(err: ArchiveError) -> Self {
        let message = err.to_string();
        match err {
            ArchiveError::SaturdayData {
                timestamp,
                row,
                file,
            } => ExError::new(ExErrorKind::SaturdayData)
                .with_op("ingest")
                .with_timestamp(timestamp)
                .with_row(row)
                .with_file(file)
                .with_message(message),

            ArchiveError::MalformedInput { file, row, .. } => {
                let mut ex = ExError::new(ExErrorKind::MalformedInput).with_message(message);
                if let Some(file) = file {
                    ex = ex.with_file(file);
                }
                if let Some(row) = row {
                    ex = ex.with_row(row);
                }
                ex
            }

            ArchiveError::InvalidInput { .. } => {
                ExError::new(ExErrorKind::InvalidInput).with_message(message)
            }

            ArchiveError::SupersedeTargetNotFound { annotation_id }
            | ArchiveError::SupersedeTargetInactive { annotation_id, .. } => {
                ExError::new(ExErrorKind::SupersedeTargetInvalid)
                    .with_op("save_annotation")
                    .with_entity_id(annotation_id.to_string())
                    .with_message(message)
            }

            ArchiveError::AnnotationNotFound { annotation_id } => {
                ExError::new(ExErrorKind::NotFound)
                    .with_entity_id(annotation_id.to_string())
                    .with_message(message)
            }

            ArchiveError::InvalidStatusTransition { annotation_id, .. } => {
                ExError::new(ExErrorKind::InvalidStatusTransition)
                    .with_entity_id(annotation_id.to_string())
                    .with_message(message)
            }

            ArchiveError::SupersessionCycle { annotation_id } => {
                ExError::new(ExErrorKind::InvariantViolation)
                    .with_op("annotation_lineage")
                    .with_entity_id(annotation_id.to_string())
                    .with_message(message)
            }

            ArchiveError::Serialization { .. } => {
                ExError::new(ExErrorKind::Serialization).with_message(message)
            }

            // Storage failures are never re-classified
            ArchiveError::Storage(ex) => ex,
        }
    }
}
