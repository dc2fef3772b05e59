// crates/workflow-sync-core/src/core/outcome.rs
// ============================================================================
// Module: Sync Outcomes
// Description: Per-pass summaries returned by the sync engines.
// Purpose: Give manual and scheduled callers the same diagnostic shape.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Outcomes are transient: they are returned to callers and written to the
//! audit sink, never persisted. A pass always produces an outcome, even when
//! every item failed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::TeamId;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Item Errors
// ============================================================================

/// Error recorded against one item of a pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemError {
    /// Item identifier (spec path, or the listing prefix for pass errors).
    pub item: String,
    /// Error message.
    pub message: String,
}

// ============================================================================
// SECTION: Spec Sync Outcome
// ============================================================================

/// Summary of one spec sync pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncOutcome {
    /// Spec files examined.
    pub processed: u64,
    /// Definitions created.
    pub created: u64,
    /// Definitions overwritten.
    pub updated: u64,
    /// Definitions already matching their spec.
    pub unchanged: u64,
    /// Items that failed.
    pub failed: u64,
    /// Per-item error details.
    pub errors: Vec<ItemError>,
    /// Pass completion time.
    pub completed_at: Timestamp,
}

impl SyncOutcome {
    /// Creates an empty outcome; `completed_at` is set by [`Self::finish`].
    #[must_use]
    pub const fn start(now: Timestamp) -> Self {
        Self {
            processed: 0,
            created: 0,
            updated: 0,
            unchanged: 0,
            failed: 0,
            errors: Vec::new(),
            completed_at: now,
        }
    }

    /// Records a failed item.
    pub fn record_failure(&mut self, item: impl Into<String>, message: impl Into<String>) {
        self.failed += 1;
        self.errors.push(ItemError {
            item: item.into(),
            message: message.into(),
        });
    }

    /// Records a pass-level error without counting an item.
    pub fn record_pass_error(&mut self, item: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ItemError {
            item: item.into(),
            message: message.into(),
        });
    }

    /// Stamps the completion time.
    #[must_use]
    pub fn finish(mut self, now: Timestamp) -> Self {
        self.completed_at = now;
        self
    }
}

// ============================================================================
// SECTION: Run Sync Outcomes
// ============================================================================

/// Summary of one cluster's reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterSyncOutcome {
    /// Cluster (team) identifier.
    pub team: TeamId,
    /// External runs fetched.
    pub fetched: u64,
    /// Local runs whose state changed.
    pub updated: u64,
    /// Local runs re-observed without change.
    pub unchanged: u64,
    /// External runs adopted as new local runs.
    pub adopted: u64,
    /// External runs skipped by the adoption policy.
    pub skipped: u64,
    /// Local runs marked `UNKNOWN` by the staleness rule.
    pub stale: u64,
    /// Cluster-level failure, when the pass could not complete.
    pub error: Option<String>,
    /// Completion time.
    pub completed_at: Timestamp,
}

impl ClusterSyncOutcome {
    /// Creates an empty outcome for `team`.
    #[must_use]
    pub const fn start(team: TeamId, now: Timestamp) -> Self {
        Self {
            team,
            fetched: 0,
            updated: 0,
            unchanged: 0,
            adopted: 0,
            skipped: 0,
            stale: 0,
            error: None,
            completed_at: now,
        }
    }

    /// Returns true when the cluster pass failed.
    #[must_use]
    pub const fn is_failed(&self) -> bool {
        self.error.is_some()
    }
}

/// Summary of one all-cluster reconciliation pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateSyncOutcome {
    /// One outcome per active cluster, ordered by team.
    pub clusters: Vec<ClusterSyncOutcome>,
    /// Pass-level failure (e.g. clusters could not be listed).
    pub error: Option<String>,
    /// Completion time.
    pub completed_at: Timestamp,
}

impl AggregateSyncOutcome {
    /// Number of clusters whose pass failed.
    #[must_use]
    pub fn failed_clusters(&self) -> usize {
        self.clusters.iter().filter(|cluster| cluster.is_failed()).count()
    }
}
