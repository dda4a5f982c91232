//! Batch data model: lifecycle status, progress snapshots, per-row results
//! and the terminal result snapshot.

use serde::{Deserialize, Serialize};

use crate::ingest::HospitalRow;
use crate::types::{BatchId, Timestamp};

// ---------------------------------------------------------------------------
// Batch status
// ---------------------------------------------------------------------------

/// Lifecycle status of a batch pass.
///
/// `Queued → Processing → {Completed, PartialFailed}`. A retry moves a
/// terminal batch back to `Queued`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    Queued,
    Processing,
    Completed,
    PartialFailed,
}

impl BatchStatus {
    /// Wire name, as used in progress snapshots and API messages.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::PartialFailed => "partial_failed",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::PartialFailed)
    }
}

impl std::fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Progress snapshot
// ---------------------------------------------------------------------------

/// Point-in-time progress of the current pass.
///
/// `processed + failed <= total` always holds; the two sides are equal once
/// `status` is terminal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchProgress {
    pub total: usize,
    pub processed: usize,
    pub failed: usize,
    pub status: BatchStatus,
}

impl BatchProgress {
    /// Fresh progress for a pass over `total` rows.
    pub fn queued(total: usize) -> Self {
        Self {
            total,
            processed: 0,
            failed: 0,
            status: BatchStatus::Queued,
        }
    }

    /// Rows attempted so far in this pass.
    pub fn attempted(&self) -> usize {
        self.processed + self.failed
    }
}

// ---------------------------------------------------------------------------
// Row results
// ---------------------------------------------------------------------------

/// Outcome of one submitted row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowStatus {
    Created,
    CreatedAndActivated,
    Failed,
}

/// Result of submitting a single row to the directory.
///
/// `hospital_id` is set iff creation succeeded; `error` is set iff the row
/// failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowResult {
    /// 1-based position of the row in the original upload.
    pub row: usize,
    pub hospital_id: Option<i64>,
    pub name: String,
    pub status: RowStatus,
    pub error: Option<String>,
}

impl RowResult {
    pub fn created(row: usize, hospital_id: i64, name: impl Into<String>) -> Self {
        Self {
            row,
            hospital_id: Some(hospital_id),
            name: name.into(),
            status: RowStatus::Created,
            error: None,
        }
    }

    pub fn failed(row: usize, name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            row,
            hospital_id: None,
            name: name.into(),
            status: RowStatus::Failed,
            error: Some(error.into()),
        }
    }

    pub fn is_failed(&self) -> bool {
        self.status == RowStatus::Failed
    }
}

/// An input row tagged with its 1-based position in the original upload.
///
/// Failed rows are kept in this form for retry so a retried row reports the
/// same `row` index as in the first pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexedRow {
    pub row: usize,
    pub hospital: HospitalRow,
}

/// Number rows from 1 in input order.
pub fn index_rows(rows: Vec<HospitalRow>) -> Vec<IndexedRow> {
    rows.into_iter()
        .enumerate()
        .map(|(i, hospital)| IndexedRow { row: i + 1, hospital })
        .collect()
}

// ---------------------------------------------------------------------------
// Final result
// ---------------------------------------------------------------------------

/// Terminal snapshot of a batch, merged across every pass so far.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalResult {
    pub batch_id: BatchId,
    /// Row count of the original upload, unchanged by retries.
    pub total_hospitals: usize,
    pub processed_hospitals: usize,
    pub failed_hospitals: usize,
    /// Wall-clock duration of the latest pass, rounded to 10 ms.
    pub processing_time_seconds: f64,
    pub batch_activated: bool,
    pub completed_at: Timestamp,
    /// Row results ordered by `row`.
    pub hospitals: Vec<RowResult>,
}

impl FinalResult {
    /// Terminal status implied by the merged row results.
    pub fn status(&self) -> BatchStatus {
        if self.failed_hospitals == 0 {
            BatchStatus::Completed
        } else {
            BatchStatus::PartialFailed
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
