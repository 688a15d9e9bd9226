//! Annotation command handlers with boundary logging.
//!
//! - Save (optionally superseding an active annotation)
//! - List by symbol, date range, tags, status and type
//! - Deprecate
//! - Lineage (supersession chain)
//!
//! ## Logging Ownership
//!
//! The engine layer owns lifecycle logging for annotation operations:
//! - `log_op_start!` at entry
//! - `log_op_end!` on success
//! - `log_op_error!` on failure
//!
//! Lower layers (store, core) use only `tracing::debug!()` for internal details.

#![allow(clippy::result_large_err)]

use archivist_core::annotations::{
    annotation_lineage as lineage, deprecate_annotation, list_annotations, save_annotation,
};
use archivist_core::errors::ExError;
use archivist_core::model::{Annotation, AnnotationDraft, AnnotationId, AnnotationQuery};
use archivist_core::{log_op_end, log_op_error, log_op_start};
use archivist_store::errors::Result;
use archivist_store::SqliteStore;
use rusqlite::Connection;

use super::now;

/// Save an annotation
///
/// ## Arguments
///
/// - `draft`: Annotation content, anchor date and optional supersede target
/// - `anchor_source`: Source recorded on a newly created anchor
/// - `conn`: Database connection
///
/// ## Returns
///
/// The new annotation's id
///
/// ## Errors
///
/// - `InvalidInput`: empty symbol or content
/// - `SupersedeTargetInvalid`: target missing or not active; nothing written
/// - `Persistence`: Database error
pub fn annotation_save(
    draft: &AnnotationDraft,
    anchor_source: &str,
    conn: &Connection,
) -> Result<AnnotationId> {
    log_op_start!(
        "annotation_save",
        symbol = draft.symbol.as_str(),
        session_date = %draft.session_date,
        supersedes = ?draft.supersedes
    );
    let start = std::time::Instant::now();

    let mut store = SqliteStore::new(conn);
    let id = save_annotation(&mut store, draft, anchor_source, now())
        .map_err(ExError::from)
        .map_err(|e| {
            log_op_error!(
                "annotation_save",
                e.clone(),
                duration_ms = start.elapsed().as_millis() as u64
            );
            e
        })?;

    log_op_end!(
        "annotation_save",
        duration_ms = start.elapsed().as_millis() as u64,
        annotation_id = id
    );

    Ok(id)
}

/// List annotations matching a query
///
/// ## Errors
///
/// - `InvalidInput`: start date after end date
/// - `Persistence`: Database error
pub fn annotation_list(query: &AnnotationQuery, conn: &Connection) -> Result<Vec<Annotation>> {
    log_op_start!(
        "annotation_list",
        symbol = query.symbol.as_str(),
        start_date = %query.start,
        end_date = %query.end
    );
    let start = std::time::Instant::now();

    let store = SqliteStore::new(conn);
    let annotations = list_annotations(&store, query)
        .map_err(ExError::from)
        .map_err(|e| {
            log_op_error!(
                "annotation_list",
                e.clone(),
                duration_ms = start.elapsed().as_millis() as u64
            );
            e
        })?;

    log_op_end!(
        "annotation_list",
        duration_ms = start.elapsed().as_millis() as u64,
        count = annotations.len()
    );

    Ok(annotations)
}

/// Deprecate an active annotation
///
/// ## Errors
///
/// - `NotFound`: unknown id
/// - `InvalidStatusTransition`: annotation is not active
/// - `Persistence`: Database error
pub fn annotation_deprecate(id: AnnotationId, conn: &Connection) -> Result<()> {
    log_op_start!("annotation_deprecate", annotation_id = id);
    let start = std::time::Instant::now();

    let mut store = SqliteStore::new(conn);
    deprecate_annotation(&mut store, id)
        .map_err(ExError::from)
        .map_err(|e| {
            log_op_error!(
                "annotation_deprecate",
                e.clone(),
                duration_ms = start.elapsed().as_millis() as u64
            );
            e
        })?;

    log_op_end!(
        "annotation_deprecate",
        duration_ms = start.elapsed().as_millis() as u64,
        annotation_id = id
    );

    Ok(())
}

/// Supersession chain of an annotation, newest first
///
/// ## Errors
///
/// - `NotFound`: unknown id
/// - `InvariantViolation`: the chain forms a cycle
/// - `Persistence`: Database error
pub fn annotation_lineage(id: AnnotationId, conn: &Connection) -> Result<Vec<Annotation>> {
    log_op_start!("annotation_lineage", annotation_id = id);
    let start = std::time::Instant::now();

    let store = SqliteStore::new(conn);
    let chain = lineage(&store, id).map_err(ExError::from).map_err(|e| {
        log_op_error!(
            "annotation_lineage",
            e.clone(),
            duration_ms = start.elapsed().as_millis() as u64
        );
        e
    })?;

    log_op_end!(
        "annotation_lineage",
        duration_ms = start.elapsed().as_millis() as u64,
        depth = chain.len()
    );

    Ok(chain)
}
