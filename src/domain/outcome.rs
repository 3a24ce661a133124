//! Per-item decisions and the per-run summary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::record::TrackedField;

/// What the reconciler decided for one candidate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// No stored record exists for the key
    Create,

    /// The stored record differs on at least one tracked field
    Update { changed: Vec<TrackedField> },

    /// Every tracked field matches
    NoOp,
}

impl Decision {
    /// Whether this decision writes to the store
    pub fn is_change(&self) -> bool {
        !matches!(self, Decision::NoOp)
    }
}

/// A manifest item that could not be processed this run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedItem {
    pub filename: String,
    pub error: String,
}

/// Aggregate result of one run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunOutcome {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub dry_run: bool,

    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub failed: Vec<FailedItem>,

    /// Orphans removed by the sweep (or that would be, in a dry run)
    pub deleted: usize,

    /// Record count after the sweep
    pub total_records: usize,

    /// Entries written to the search index
    pub indexed: usize,

    /// Set when the search index could not be updated
    pub index_error: Option<String>,

    /// Set when the orphan sweep or the final listing failed; `deleted` and
    /// `total_records` are then not meaningful
    pub sweep_error: Option<String>,
}

impl RunOutcome {
    pub fn new(run_id: Uuid, dry_run: bool) -> Self {
        Self {
            run_id,
            started_at: Utc::now(),
            finished_at: None,
            dry_run,
            created: 0,
            updated: 0,
            unchanged: 0,
            failed: Vec::new(),
            deleted: 0,
            total_records: 0,
            indexed: 0,
            index_error: None,
            sweep_error: None,
        }
    }

    /// Count a decision that was carried out
    pub fn record(&mut self, decision: &Decision) {
        match decision {
            Decision::Create => self.created += 1,
            Decision::Update { .. } => self.updated += 1,
            Decision::NoOp => self.unchanged += 1,
        }
    }

    pub fn record_failure(&mut self, filename: impl Into<String>, error: impl ToString) {
        self.failed.push(FailedItem {
            filename: filename.into(),
            error: error.to_string(),
        });
    }

    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }

    /// Number of manifest items seen
    pub fn processed(&self) -> usize {
        self.created + self.updated + self.unchanged + self.failed.len()
    }

    /// Whether the run changed nothing in the store
    pub fn is_quiescent(&self) -> bool {
        self.created == 0 && self.updated == 0 && self.deleted == 0
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    /// Duration in milliseconds (if finished)
    pub fn duration_ms(&self) -> Option<i64> {
        self.finished_at
            .map(|end| (end - self.started_at).num_milliseconds())
    }
}
