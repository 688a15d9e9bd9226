//! Annotation versioning engine
//!
//! Annotations are never edited in place. Saving with `supersedes` writes a
//! new active record and flips the target from active to superseded inside
//! one store unit, so either both land or neither does (anchor creation
//! included).

use std::collections::HashSet;

use crate::errors::{ArchiveError, Result};
use crate::model::{
    Annotation, AnnotationDraft, AnnotationId, AnnotationQuery, AnnotationRecord,
    AnnotationStatus, TradeDayKey,
};
use crate::store::SessionStore;

/// Default source for annotation anchors, shared with bar ingestion
pub const DEFAULT_ANCHOR_SOURCE: &str = "tradingview";

/// Trim tags, drop empty ones, and remove duplicates keeping first occurrence
pub fn normalize_tags(tags: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    tags.iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .filter(|t| seen.insert(t.to_string()))
        .map(str::to_string)
        .collect()
}

/// Save a new annotation, optionally superseding an active one
///
/// # Errors
///
/// - `InvalidInput` for an empty symbol or content
/// - `SupersedeTargetNotFound` / `SupersedeTargetInactive` when the
///   supersede target is missing or not active; nothing is written
/// - `Storage` for store failures
pub fn save_annotation<S: SessionStore>(
    store: &mut S,
    draft: &AnnotationDraft,
    anchor_source: &str,
    created_at: i64,
) -> Result<AnnotationId> {
    let symbol = draft.symbol.trim();
    if symbol.is_empty() {
        return Err(ArchiveError::invalid_input("symbol must not be empty"));
    }
    if draft.content.trim().is_empty() {
        return Err(ArchiveError::invalid_input("content must not be empty"));
    }
    if anchor_source.trim().is_empty() {
        return Err(ArchiveError::invalid_input(
            "anchor source must not be empty",
        ));
    }

    let tags = normalize_tags(&draft.tags);
    let key = TradeDayKey::new(symbol, draft.session_date, anchor_source);

    store.atomically(|store| {
        if let Some(target) = draft.supersedes {
            let existing = store
                .get_annotation(target)?
                .ok_or(ArchiveError::SupersedeTargetNotFound {
                    annotation_id: target,
                })?;
            if existing.status != AnnotationStatus::Active {
                return Err(ArchiveError::SupersedeTargetInactive {
                    annotation_id: target,
                    status: existing.status,
                });
            }
        }

        let (trade_day, _) = store.upsert_trade_day(&key)?;

        let id = store.insert_annotation(&AnnotationRecord {
            trade_day_id: trade_day.id,
            annotation_type: draft.annotation_type,
            content: draft.content.clone(),
            tags,
            provenance: draft.provenance,
            created_at,
            supersedes_id: draft.supersedes,
            status: AnnotationStatus::Active,
        })?;

        if let Some(target) = draft.supersedes {
            let flipped = store.update_annotation_status(
                target,
                AnnotationStatus::Active,
                AnnotationStatus::Superseded,
            )?;
            if !flipped {
                // Lost a race with another writer between the check and the flip
                let status = store
                    .get_annotation(target)?
                    .map_or(AnnotationStatus::Superseded, |a| a.status);
                return Err(ArchiveError::SupersedeTargetInactive {
                    annotation_id: target,
                    status,
                });
            }
        }

        tracing::debug!(
            annotation_id = id,
            symbol = %key.symbol,
            session_date = %key.session_date,
            supersedes = ?draft.supersedes,
            "annotation saved"
        );
        Ok(id)
    })
}

/// List annotations for a symbol and inclusive date range
///
/// Tags match any-of. Results are ordered by session date, creation time,
/// then id.
///
/// # Errors
///
/// Returns `InvalidInput` when `start > end`, or a store error.
pub fn list_annotations<S: SessionStore>(
    store: &S,
    query: &AnnotationQuery,
) -> Result<Vec<Annotation>> {
    if query.start > query.end {
        return Err(ArchiveError::invalid_input(format!(
            "start date {} is after end date {}",
            query.start, query.end
        )));
    }

    let wanted = normalize_tags(&query.tags);
    let mut annotations: Vec<Annotation> = store
        .query_annotations(query)?
        .into_iter()
        .filter(|a| a.has_any_tag(&wanted))
        .collect();
    annotations.sort_by_key(|a| (a.session_date, a.created_at, a.id));
    Ok(annotations)
}

/// Retire an active annotation without a replacement
///
/// # Errors
///
/// Returns `AnnotationNotFound` for an unknown id and
/// `InvalidStatusTransition` when the annotation is not active.
pub fn deprecate_annotation<S: SessionStore>(store: &mut S, id: AnnotationId) -> Result<()> {
    let flipped =
        store.update_annotation_status(id, AnnotationStatus::Active, AnnotationStatus::Deprecated)?;
    if flipped {
        return Ok(());
    }

    match store.get_annotation(id)? {
        None => Err(ArchiveError::AnnotationNotFound { annotation_id: id }),
        Some(annotation) => Err(ArchiveError::InvalidStatusTransition {
            annotation_id: id,
            from: annotation.status,
            to: AnnotationStatus::Deprecated,
        }),
    }
}

/// The supersession chain from `id` back to its root, newest first
///
/// # Errors
///
/// Returns `AnnotationNotFound` for an unknown id and `SupersessionCycle`
/// if the chain revisits an annotation.
pub fn annotation_lineage<S: SessionStore>(
    store: &S,
    id: AnnotationId,
) -> Result<Vec<Annotation>> {
    let mut chain = Vec::new();
    let mut visited = HashSet::new();
    let mut next = Some(id);

    while let Some(current) = next {
        if !visited.insert(current) {
            return Err(ArchiveError::SupersessionCycle {
                annotation_id: current,
            });
        }
        let annotation = store
            .get_annotation(current)?
            .ok_or(ArchiveError::AnnotationNotFound {
                annotation_id: current,
            })?;
        next = annotation.supersedes_id;
        chain.push(annotation);
    }

    Ok(chain)
}
