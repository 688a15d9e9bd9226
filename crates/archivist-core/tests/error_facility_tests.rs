use archivist_core::errors::{ArchiveError, ExError, ExErrorKind};
use archivist_core::model::AnnotationStatus;
use archivist_core_types::RunId;

#[test]
fn test_saturday_carries_full_location() {
    let err = ArchiveError::SaturdayData {
        timestamp: 1_705_140_000,
        row: 12,
        file: "mnq_1m.csv".to_string(),
    };

    let ex_err: ExError = err.into();

    assert_eq!(ex_err.kind(), ExErrorKind::SaturdayData);
    assert_eq!(ex_err.code(), "ERR_SATURDAY_DATA");
    assert_eq!(ex_err.timestamp(), Some(1_705_140_000));
    assert_eq!(ex_err.row(), Some(12));
    assert_eq!(ex_err.file(), Some("mnq_1m.csv"));
    assert!(ex_err.kind().is_batch_fatal());
}

#[test]
fn test_supersede_errors_share_a_kind() {
    let missing: ExError = ArchiveError::SupersedeTargetNotFound { annotation_id: 3 }.into();
    let inactive: ExError = ArchiveError::SupersedeTargetInactive {
        annotation_id: 4,
        status: AnnotationStatus::Deprecated,
    }
    .into();

    assert_eq!(missing.kind(), ExErrorKind::SupersedeTargetInvalid);
    assert_eq!(inactive.kind(), ExErrorKind::SupersedeTargetInvalid);
    assert_eq!(missing.entity_id(), Some("3"));
    assert!(inactive.message().contains("deprecated"));
}

#[test]
fn test_not_found_distinct_from_transition() {
    let not_found: ExError = ArchiveError::AnnotationNotFound { annotation_id: 9 }.into();
    let transition: ExError = ArchiveError::InvalidStatusTransition {
        annotation_id: 9,
        from: AnnotationStatus::Superseded,
        to: AnnotationStatus::Deprecated,
    }
    .into();

    assert_eq!(not_found.code(), "ERR_NOT_FOUND");
    assert_eq!(transition.code(), "ERR_INVALID_STATUS_TRANSITION");
    assert_ne!(not_found.kind(), transition.kind());
}

#[test]
fn test_cycle_is_invariant_violation() {
    let ex_err: ExError = ArchiveError::SupersessionCycle { annotation_id: 2 }.into();
    assert_eq!(ex_err.kind(), ExErrorKind::InvariantViolation);
    assert_eq!(ex_err.op(), Some("annotation_lineage"));
}

#[test]
fn test_serde_error_maps_to_serialization() {
    let json_err = serde_json::from_str::<Vec<String>>("not json").unwrap_err();
    let ex_err: ExError = ArchiveError::from(json_err).into();
    assert_eq!(ex_err.kind(), ExErrorKind::Serialization);
}

#[test]
fn test_error_kind_code_mapping() {
    let kinds = vec![
        (ExErrorKind::InvalidInput, "ERR_INVALID_INPUT"),
        (ExErrorKind::MalformedInput, "ERR_MALFORMED_INPUT"),
        (ExErrorKind::SaturdayData, "ERR_SATURDAY_DATA"),
        (ExErrorKind::NotFound, "ERR_NOT_FOUND"),
        (ExErrorKind::Config, "ERR_CONFIG"),
        (ExErrorKind::Persistence, "ERR_PERSISTENCE"),
        (ExErrorKind::ConstraintViolation, "ERR_CONSTRAINT_VIOLATION"),
    ];

    for (kind, expected_code) in kinds {
        assert_eq!(kind.code(), expected_code);
    }
}

#[test]
fn test_builder_keeps_run_id() {
    let run_id = RunId::from_string("run-1".to_string());
    let err = ExError::new(ExErrorKind::Io)
        .with_op("ingest_file")
        .with_run_id(run_id.clone())
        .with_message("file vanished");

    assert_eq!(err.run_id(), Some(&run_id));
    assert!(err.to_string().contains("in operation 'ingest_file'"));
}
