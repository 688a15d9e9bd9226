//! Annotation model
//!
//! Annotations are append-only. A correction is a new annotation whose
//! `supersedes_id` points at the record it replaces; the replaced record's
//! status flips to `superseded` and is otherwise left untouched. The chain
//! is a child → parent back-reference only.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::trade_day::TradeDayId;

/// Row identifier of an annotation
pub type AnnotationId = i64;

/// What kind of note an annotation is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnnotationType {
    Observation,
    Hypothesis,
    Review,
}

impl AnnotationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnnotationType::Observation => "observation",
            AnnotationType::Hypothesis => "hypothesis",
            AnnotationType::Review => "review",
        }
    }
}

impl fmt::Display for AnnotationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnnotationType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "observation" => Ok(AnnotationType::Observation),
            "hypothesis" => Ok(AnnotationType::Hypothesis),
            "review" => Ok(AnnotationType::Review),
            other => Err(format!("unknown annotation type '{}'", other)),
        }
    }
}

/// Who wrote an annotation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    Manual,
    Script,
}

impl Provenance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provenance::Manual => "manual",
            Provenance::Script => "script",
        }
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provenance {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "manual" => Ok(Provenance::Manual),
            "script" => Ok(Provenance::Script),
            other => Err(format!("unknown provenance '{}'", other)),
        }
    }
}

/// Lifecycle status of an annotation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnnotationStatus {
    Active,
    Superseded,
    Deprecated,
}

impl AnnotationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnnotationStatus::Active => "active",
            AnnotationStatus::Superseded => "superseded",
            AnnotationStatus::Deprecated => "deprecated",
        }
    }
}

impl fmt::Display for AnnotationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnnotationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(AnnotationStatus::Active),
            "superseded" => Ok(AnnotationStatus::Superseded),
            "deprecated" => Ok(AnnotationStatus::Deprecated),
            other => Err(format!("unknown annotation status '{}'", other)),
        }
    }
}

/// Status filter for annotation reads
///
/// Defaults to active only, the "current truth" view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    Active,
    Only(AnnotationStatus),
    All,
}

impl StatusFilter {
    pub fn matches(&self, status: AnnotationStatus) -> bool {
        match self {
            StatusFilter::Active => status == AnnotationStatus::Active,
            StatusFilter::Only(wanted) => status == *wanted,
            StatusFilter::All => true,
        }
    }

    /// The single status to filter on, or `None` for all
    pub fn status(&self) -> Option<AnnotationStatus> {
        match self {
            StatusFilter::Active => Some(AnnotationStatus::Active),
            StatusFilter::Only(status) => Some(*status),
            StatusFilter::All => None,
        }
    }
}

impl FromStr for StatusFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(StatusFilter::All),
            "active" => Ok(StatusFilter::Active),
            other => other.parse().map(StatusFilter::Only),
        }
    }
}

/// Caller input for saving an annotation
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationDraft {
    pub symbol: String,
    pub session_date: NaiveDate,
    pub content: String,
    pub annotation_type: AnnotationType,
    pub tags: Vec<String>,
    pub provenance: Provenance,
    pub supersedes: Option<AnnotationId>,
}

impl AnnotationDraft {
    /// A manual observation with no tags
    pub fn observation(
        symbol: impl Into<String>,
        session_date: NaiveDate,
        content: impl Into<String>,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            session_date,
            content: content.into(),
            annotation_type: AnnotationType::Observation,
            tags: Vec::new(),
            provenance: Provenance::Manual,
            supersedes: None,
        }
    }

    pub fn with_type(mut self, annotation_type: AnnotationType) -> Self {
        self.annotation_type = annotation_type;
        self
    }

    pub fn with_tags<I, T>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_provenance(mut self, provenance: Provenance) -> Self {
        self.provenance = provenance;
        self
    }

    pub fn superseding(mut self, id: AnnotationId) -> Self {
        self.supersedes = Some(id);
        self
    }
}

/// Row written to the store for a new annotation
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationRecord {
    pub trade_day_id: TradeDayId,
    pub annotation_type: AnnotationType,
    pub content: String,
    pub tags: Vec<String>,
    pub provenance: Provenance,
    pub created_at: i64,
    pub supersedes_id: Option<AnnotationId>,
    pub status: AnnotationStatus,
}

/// A stored annotation joined with its anchor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub id: AnnotationId,
    pub trade_day_id: TradeDayId,
    pub symbol: String,
    pub session_date: NaiveDate,
    pub annotation_type: AnnotationType,
    pub content: String,
    pub tags: Vec<String>,
    pub provenance: Provenance,
    pub created_at: i64,
    pub supersedes_id: Option<AnnotationId>,
    pub status: AnnotationStatus,
}

impl Annotation {
    /// Any-of tag match; an empty request matches everything
    pub fn has_any_tag(&self, wanted: &[String]) -> bool {
        wanted.is_empty() || wanted.iter().any(|t| self.tags.contains(t))
    }
}

/// Annotation read query
///
/// Dates are inclusive session dates. Stores apply symbol, date, status and
/// type; tag matching is applied on top by the annotation engine.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationQuery {
    pub symbol: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub tags: Vec<String>,
    pub status: StatusFilter,
    pub annotation_type: Option<AnnotationType>,
}

impl AnnotationQuery {
    pub fn new(symbol: impl Into<String>, start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            symbol: symbol.into(),
            start,
            end,
            tags: Vec::new(),
            status: StatusFilter::default(),
            annotation_type: None,
        }
    }

    pub fn with_tags<I, T>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_status(mut self, status: StatusFilter) -> Self {
        self.status = status;
        self
    }

    pub fn with_type(mut self, annotation_type: AnnotationType) -> Self {
        self.annotation_type = Some(annotation_type);
        self
    }
}
