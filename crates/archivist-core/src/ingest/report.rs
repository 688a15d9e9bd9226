//! Ingestion report

use serde::{Deserialize, Serialize};

use crate::model::Ohlcv;

/// Why a row was reported instead of inserted or skipped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportReason {
    #[serde(rename = "OHLCV mismatch")]
    OhlcvMismatch,
    #[serde(rename = "market closed (post-close)")]
    PostClose,
}

impl ReportReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportReason::OhlcvMismatch => "OHLCV mismatch",
            ReportReason::PostClose => "market closed (post-close)",
        }
    }

    /// Rejections carry no stored value to compare against
    pub fn is_rejection(&self) -> bool {
        !matches!(self, ReportReason::OhlcvMismatch)
    }
}

impl std::fmt::Display for ReportReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One reported row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConflictDetail {
    pub timestamp: i64,
    /// 1-based row number within the batch
    pub row: usize,
    pub reason: ReportReason,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub existing: Option<Ohlcv>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new: Option<Ohlcv>,
    pub file: String,
}

/// Outcome counts of one ingestion batch
///
/// `inserted + skipped + conflicts + rejected` equals the number of rows
/// processed. `halted` counts the subset of those that hit the halt bucket.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IngestReport {
    pub inserted: usize,
    pub skipped: usize,
    pub conflicts: usize,
    pub rejected: usize,
    pub halted: usize,
    pub anchors_created: usize,
    pub conflict_details: Vec<ConflictDetail>,
}

impl IngestReport {
    pub fn rows_processed(&self) -> usize {
        self.inserted + self.skipped + self.conflicts + self.rejected
    }

    /// Only the OHLCV mismatches, rejections excluded
    pub fn mismatches(&self) -> impl Iterator<Item = &ConflictDetail> {
        self.conflict_details
            .iter()
            .filter(|d| d.reason == ReportReason::OhlcvMismatch)
    }
}
