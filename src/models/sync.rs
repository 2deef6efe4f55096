//! Sync outcome data structures.

use serde::{Deserialize, Serialize};

/// Terminal state of one repository sync unit.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SyncStatus {
    /// Metadata and readme fetched, project set replaced
    Synced,
    /// Metadata fetched but readme unobtainable; prior projects preserved
    SoftFailed,
    /// Base metadata unobtainable; no store mutation
    HardFailed,
    /// Unit not started because the batch was cancelled
    Skipped,
}

/// Result of syncing a single repository.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncOutcome {
    pub full_name: String,
    pub status: SyncStatus,
    /// Number of projects persisted in this unit
    pub projects: usize,
    /// Failure reason for soft/hard failures
    pub error: Option<String>,
    /// Index submission failure, recorded without rolling back the store
    pub index_error: Option<String>,
}

impl SyncOutcome {
    pub fn synced(full_name: impl Into<String>, projects: usize) -> Self {
        Self {
            full_name: full_name.into(),
            status: SyncStatus::Synced,
            projects,
            error: None,
            index_error: None,
        }
    }

    pub fn soft_failed(full_name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            full_name: full_name.into(),
            status: SyncStatus::SoftFailed,
            projects: 0,
            error: Some(error.into()),
            index_error: None,
        }
    }

    pub fn hard_failed(full_name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            full_name: full_name.into(),
            status: SyncStatus::HardFailed,
            projects: 0,
            error: Some(error.into()),
            index_error: None,
        }
    }

    pub fn skipped(full_name: impl Into<String>) -> Self {
        Self {
            full_name: full_name.into(),
            status: SyncStatus::Skipped,
            projects: 0,
            error: None,
            index_error: None,
        }
    }
}

/// Aggregate result of a sync batch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchResult {
    pub outcomes: Vec<SyncOutcome>,
    pub synced: usize,
    pub soft_failed: usize,
    pub hard_failed: usize,
    pub skipped: usize,
}

impl BatchResult {
    /// Fold one outcome into the aggregate counts.
    pub fn record(&mut self, outcome: SyncOutcome) {
        match outcome.status {
            SyncStatus::Synced => self.synced += 1,
            SyncStatus::SoftFailed => self.soft_failed += 1,
            SyncStatus::HardFailed => self.hard_failed += 1,
            SyncStatus::Skipped => self.skipped += 1,
        }
        self.outcomes.push(outcome);
    }

    /// Total number of repository units in the batch.
    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    /// Total number of projects persisted across the batch.
    pub fn project_count(&self) -> usize {
        self.outcomes.iter().map(|o| o.projects).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_counts() {
        let mut batch = BatchResult::default();
        batch.record(SyncOutcome::synced("a/x", 3));
        batch.record(SyncOutcome::soft_failed("b/y", "no readme"));
        batch.record(SyncOutcome::hard_failed("c/z", "not found"));
        batch.record(SyncOutcome::skipped("d/w"));

        assert_eq!(batch.total(), 4);
        assert_eq!(batch.synced, 1);
        assert_eq!(batch.soft_failed, 1);
        assert_eq!(batch.hard_failed, 1);
        assert_eq!(batch.skipped, 1);
        assert_eq!(batch.project_count(), 3);
    }
}
