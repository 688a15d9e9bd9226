//! Annotation commands: annotate, deprecate, annotations, lineage

use archivist_core::model::{
    AnnotationDraft, AnnotationId, AnnotationQuery, AnnotationType, Provenance, StatusFilter,
};
use archivist_engine::commands::annotation::{
    annotation_deprecate, annotation_lineage, annotation_list, annotation_save,
};
use archivist_engine::commands::database::database_open;
use archivist_engine::ArchiveConfig;
use chrono::NaiveDate;
use clap::Args;
use serde_json::json;

use super::print_json;

#[derive(Debug, Args)]
pub struct AnnotateArgs {
    #[arg(long)]
    pub symbol: String,

    /// Session date (YYYY-MM-DD)
    #[arg(long)]
    pub date: NaiveDate,

    #[arg(long)]
    pub content: String,

    /// observation, hypothesis or review
    #[arg(long = "type", default_value = "observation")]
    pub annotation_type: AnnotationType,

    /// Repeatable
    #[arg(long = "tag")]
    pub tags: Vec<String>,

    /// manual or script
    #[arg(long, default_value = "manual")]
    pub provenance: Provenance,

    /// Id of the active annotation this one replaces
    #[arg(long)]
    pub supersedes: Option<AnnotationId>,
}

#[derive(Debug, Args)]
pub struct DeprecateArgs {
    pub id: AnnotationId,
}

#[derive(Debug, Args)]
pub struct ListArgs {
    #[arg(long)]
    pub symbol: String,

    /// First session date (YYYY-MM-DD)
    #[arg(long)]
    pub start: NaiveDate,

    /// Last session date, inclusive (default: --start)
    #[arg(long)]
    pub end: Option<NaiveDate>,

    /// Match any of these tags; repeatable
    #[arg(long = "tag")]
    pub tags: Vec<String>,

    /// active, superseded, deprecated or all
    #[arg(long, default_value = "active")]
    pub status: StatusFilter,

    #[arg(long = "type")]
    pub annotation_type: Option<AnnotationType>,
}

#[derive(Debug, Args)]
pub struct LineageArgs {
    pub id: AnnotationId,
}

pub fn execute_save(
    args: AnnotateArgs,
    config: &ArchiveConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut draft = AnnotationDraft::observation(args.symbol, args.date, args.content)
        .with_type(args.annotation_type)
        .with_tags(args.tags)
        .with_provenance(args.provenance);
    if let Some(target) = args.supersedes {
        draft = draft.superseding(target);
    }

    let conn = database_open(&config.db_path)?;
    let id = annotation_save(&draft, &config.annotation_anchor_source, &conn)?;
    print_json(&json!({ "annotation_id": id, "supersedes": args.supersedes }))
}

pub fn execute_deprecate(
    args: DeprecateArgs,
    config: &ArchiveConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let conn = database_open(&config.db_path)?;
    annotation_deprecate(args.id, &conn)?;
    print_json(&json!({ "annotation_id": args.id, "status": "deprecated" }))
}

pub fn execute_list(args: ListArgs, config: &ArchiveConfig) -> Result<(), Box<dyn std::error::Error>> {
    let end = args.end.unwrap_or(args.start);
    let mut query = AnnotationQuery::new(args.symbol, args.start, end)
        .with_tags(args.tags)
        .with_status(args.status);
    if let Some(annotation_type) = args.annotation_type {
        query = query.with_type(annotation_type);
    }

    let conn = database_open(&config.db_path)?;
    let annotations = annotation_list(&query, &conn)?;
    print_json(&annotations)
}

pub fn execute_lineage(
    args: LineageArgs,
    config: &ArchiveConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let conn = database_open(&config.db_path)?;
    let chain = annotation_lineage(args.id, &conn)?;
    print_json(&chain)
}
