// crates/workflow-sync-core/src/core/run.rs
// ============================================================================
// Module: Execution Runs
// Description: Local run records, external run observations, status mapping.
// Purpose: Define the run state machine and the total external status map.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! [`ExecutionRun`] is the platform's record of one orchestrated execution.
//! [`ExternalRun`] is what an orchestrator reports. External status strings
//! are decoded into [`ExternalRunState`], a tagged enum with an explicit
//! unrecognized arm, and mapped onto [`RunStatus`] by a fixed total table.
//!
//! Local state machine:
//! `PENDING -> RUNNING -> {SUCCESS, FAILED, SKIPPED}`,
//! `PENDING/RUNNING -> STOPPING -> STOPPED`, `any -> UNKNOWN`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::ExternalRunId;
use crate::core::identifiers::RunId;
use crate::core::identifiers::TeamId;
use crate::core::identifiers::WorkflowName;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Local Status
// ============================================================================

/// Local status of an execution run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    /// Triggered, not yet started.
    Pending,
    /// Executing.
    Running,
    /// Completed successfully.
    Success,
    /// Completed with failure.
    Failed,
    /// Skipped by the orchestrator.
    Skipped,
    /// Stop requested, awaiting confirmation.
    Stopping,
    /// Stop confirmed.
    Stopped,
    /// No longer observable externally.
    Unknown,
}

impl RunStatus {
    /// Every status, in declaration order.
    pub const ALL: [Self; 8] = [
        Self::Pending,
        Self::Running,
        Self::Success,
        Self::Failed,
        Self::Skipped,
        Self::Stopping,
        Self::Stopped,
        Self::Unknown,
    ];

    /// Returns true when the reconciler will no longer touch the run.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending | Self::Running | Self::Stopping)
    }

    /// Returns the stable storage label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Running => "RUNNING",
            Self::Success => "SUCCESS",
            Self::Failed => "FAILED",
            Self::Skipped => "SKIPPED",
            Self::Stopping => "STOPPING",
            Self::Stopped => "STOPPED",
            Self::Unknown => "UNKNOWN",
        }
    }

    /// Parses a storage label.
    #[must_use]
    pub fn parse(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|status| status.as_str() == label)
    }
}

// ============================================================================
// SECTION: External Status
// ============================================================================

/// Run state as reported by an external orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ExternalRunState {
    /// `queued`
    Queued,
    /// `scheduled`
    Scheduled,
    /// `running`
    Running,
    /// `restarting`
    Restarting,
    /// `up_for_retry`
    UpForRetry,
    /// `up_for_reschedule`
    UpForReschedule,
    /// `deferred`
    Deferred,
    /// `success`
    Success,
    /// `failed`
    Failed,
    /// `upstream_failed`
    UpstreamFailed,
    /// `skipped`
    Skipped,
    /// `removed`
    Removed,
    /// Any other value, kept verbatim.
    Unrecognized(String),
}

impl ExternalRunState {
    /// Decodes an external status string. Never fails.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "queued" => Self::Queued,
            "scheduled" => Self::Scheduled,
            "running" => Self::Running,
            "restarting" => Self::Restarting,
            "up_for_retry" => Self::UpForRetry,
            "up_for_reschedule" => Self::UpForReschedule,
            "deferred" => Self::Deferred,
            "success" => Self::Success,
            "failed" => Self::Failed,
            "upstream_failed" => Self::UpstreamFailed,
            "skipped" => Self::Skipped,
            "removed" => Self::Removed,
            _ => Self::Unrecognized(raw.to_string()),
        }
    }

    /// Maps the external state onto the local status table.
    #[must_use]
    pub const fn to_local(&self) -> RunStatus {
        match self {
            Self::Queued | Self::Scheduled => RunStatus::Pending,
            Self::Running
            | Self::Restarting
            | Self::UpForRetry
            | Self::UpForReschedule
            | Self::Deferred => RunStatus::Running,
            Self::Success => RunStatus::Success,
            Self::Failed | Self::UpstreamFailed => RunStatus::Failed,
            Self::Skipped => RunStatus::Skipped,
            Self::Removed | Self::Unrecognized(_) => RunStatus::Unknown,
        }
    }
}

/// Decides the next local status given the current one and an observation.
///
/// Terminal local runs are left alone. A run being stopped settles into
/// `STOPPED` once the orchestrator reports any terminal state.
#[must_use]
pub const fn next_status(current: RunStatus, observed: &ExternalRunState) -> RunStatus {
    if current.is_terminal() {
        return current;
    }
    let mapped = observed.to_local();
    match current {
        RunStatus::Stopping if mapped.is_terminal() => RunStatus::Stopped,
        RunStatus::Stopping => RunStatus::Stopping,
        _ => mapped,
    }
}

// ============================================================================
// SECTION: Records
// ============================================================================

/// One run as reported by an orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalRun {
    /// Orchestrator-assigned run identifier.
    pub external_id: ExternalRunId,
    /// Orchestrator workflow identifier (the workflow name).
    pub workflow_id: String,
    /// Decoded external state.
    pub state: ExternalRunState,
    /// Start time, when started.
    pub started_at: Option<Timestamp>,
    /// End time, when finished.
    pub ended_at: Option<Timestamp>,
    /// Free-form progress note from the orchestrator.
    pub note: Option<String>,
}

/// Local record of one orchestrated execution.
///
/// # Invariants
/// - `external_id`, once set, is unique across all runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionRun {
    /// Local run identifier.
    pub run_id: RunId,
    /// External run identifier when known.
    pub external_id: Option<ExternalRunId>,
    /// Owning workflow definition name.
    pub workflow: WorkflowName,
    /// Owning cluster (team).
    pub team: TeamId,
    /// Local status.
    pub status: RunStatus,
    /// Time the platform created the record.
    pub created_at: Timestamp,
    /// External start time.
    pub started_at: Option<Timestamp>,
    /// External end time.
    pub ended_at: Option<Timestamp>,
    /// Last time a reconciliation pass touched the record.
    pub last_synced_at: Option<Timestamp>,
    /// Free-form progress summary.
    pub progress: Option<String>,
}

impl ExecutionRun {
    /// Time used for look-back and staleness windows.
    #[must_use]
    pub fn reference_time(&self) -> Timestamp {
        self.started_at.unwrap_or(self.created_at)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
