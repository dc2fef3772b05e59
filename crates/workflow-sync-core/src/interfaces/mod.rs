// crates/workflow-sync-core/src/interfaces/mod.rs
// ============================================================================
// Module: Workflow Sync Interfaces
// Description: Backend-agnostic ports for storage, blobs, and orchestrators.
// Purpose: Define the contract surfaces the sync engines depend on.
// Dependencies: crate::core
// ============================================================================

//! ## Overview
//! Engines reach every external system through the traits in this module:
//! the workflow registry, run store, cluster registry, blob store, and
//! per-cluster orchestrator clients. Implementations must bound every
//! external call with a timeout and report failures as values.
//!
//! All ports are `Send + Sync` so cluster passes can share them across
//! worker threads.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Serialize;
use thiserror::Error;

use crate::core::ClusterConfig;
use crate::core::ExecutionRun;
use crate::core::ExternalRun;
use crate::core::ExternalRunId;
use crate::core::RunId;
use crate::core::TeamId;
use crate::core::Timestamp;
use crate::core::WorkflowDefinition;
use crate::core::WorkflowName;

// ============================================================================
// SECTION: Local Stores
// ============================================================================

/// Local persistence errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// A uniqueness constraint was violated.
    #[error("store conflict: {0}")]
    Conflict(String),
    /// The addressed record does not exist.
    #[error("record not found: {0}")]
    NotFound(String),
    /// Stored data is corrupt or unreadable.
    #[error("store corrupt: {0}")]
    Corrupt(String),
    /// Backend failure.
    #[error("store error: {0}")]
    Store(String),
}

/// Registry of workflow definitions keyed by name.
pub trait WorkflowRegistry: Send + Sync {
    /// Loads a definition by name, including soft-deleted ones.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend fails.
    fn get(&self, name: &WorkflowName) -> Result<Option<WorkflowDefinition>, StoreError>;

    /// Inserts or fully replaces the definition with the same name.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend fails.
    fn upsert(&self, definition: &WorkflowDefinition) -> Result<(), StoreError>;

    /// Lists every definition ordered by name.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend fails.
    fn list(&self) -> Result<Vec<WorkflowDefinition>, StoreError>;
}

/// Local run history.
pub trait RunStore: Send + Sync {
    /// Inserts a new run.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Conflict`] when the run id or external id is taken.
    fn insert(&self, run: &ExecutionRun) -> Result<(), StoreError>;

    /// Replaces an existing run, addressed by run id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] for unknown runs and
    /// [`StoreError::Conflict`] when the external id collides.
    fn update(&self, run: &ExecutionRun) -> Result<(), StoreError>;

    /// Loads a run by local id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend fails.
    fn get(&self, run_id: &RunId) -> Result<Option<ExecutionRun>, StoreError>;

    /// Loads a run by external id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend fails.
    fn find_by_external_id(
        &self,
        external_id: &ExternalRunId,
    ) -> Result<Option<ExecutionRun>, StoreError>;

    /// Lists non-terminal runs of `team` whose reference time is at or after `since`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend fails.
    fn list_open_for_team(
        &self,
        team: &TeamId,
        since: Timestamp,
    ) -> Result<Vec<ExecutionRun>, StoreError>;
}

// ============================================================================
// SECTION: Cluster Registry
// ============================================================================

/// Cluster lookup errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// No active cluster is configured for the team.
    #[error("no active cluster for team {0}")]
    NotFound(TeamId),
    /// Backend failure.
    #[error("cluster registry error: {0}")]
    Backend(String),
}

/// Resolves teams to orchestrator clusters.
pub trait ClusterRegistry: Send + Sync {
    /// Resolves the active cluster for `team`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotFound`] when no active cluster exists.
    fn resolve_for_team(&self, team: &TeamId) -> Result<ClusterConfig, RegistryError>;

    /// Lists active clusters ordered by team.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] when the backend fails.
    fn list_active(&self) -> Result<Vec<ClusterConfig>, RegistryError>;
}

// ============================================================================
// SECTION: Blob Store
// ============================================================================

/// Blob store errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BlobStoreError {
    /// Object does not exist.
    #[error("blob not found: {0}")]
    NotFound(String),
    /// Object exceeds the configured size limit.
    #[error("blob {path} exceeds size limit ({limit} bytes)")]
    TooLarge {
        /// Object path.
        path: String,
        /// Limit in bytes.
        limit: u64,
    },
    /// Path or prefix is invalid.
    #[error("invalid blob path: {0}")]
    Invalid(String),
    /// Backend or transport failure, including timeouts.
    #[error("blob store error: {0}")]
    Backend(String),
}

/// Read-only access to spec files.
pub trait BlobStore: Send + Sync {
    /// Lists object paths under `prefix`.
    ///
    /// # Errors
    ///
    /// Returns [`BlobStoreError`] when listing fails.
    fn list_spec_files(&self, prefix: &str) -> Result<Vec<String>, BlobStoreError>;

    /// Reads one object's content.
    ///
    /// # Errors
    ///
    /// Returns [`BlobStoreError`] when the object cannot be read.
    fn read_spec_file(&self, path: &str) -> Result<Vec<u8>, BlobStoreError>;
}

// ============================================================================
// SECTION: Orchestrator
// ============================================================================

/// Orchestrator client errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrchestratorError {
    /// Connection or transport failure.
    #[error("orchestrator transport error: {0}")]
    Transport(String),
    /// Request exceeded its deadline.
    #[error("orchestrator timeout: {0}")]
    Timeout(String),
    /// Credentials were rejected.
    #[error("orchestrator rejected credentials (status {0})")]
    Auth(u16),
    /// Non-success HTTP status.
    #[error("orchestrator returned status {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response excerpt.
        message: String,
    },
    /// Response body could not be decoded.
    #[error("orchestrator response malformed: {0}")]
    Malformed(String),
    /// Client configuration is invalid.
    #[error("orchestrator client invalid: {0}")]
    Invalid(String),
}

impl OrchestratorError {
    /// Returns true when the failure may succeed on retry.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) | Self::Timeout(_) => true,
            Self::Status {
                status,
                ..
            } => *status == 429 || *status >= 500,
            Self::Auth(_) | Self::Malformed(_) | Self::Invalid(_) => false,
        }
    }

    /// Returns true when a mutating request may have been applied despite
    /// the error, so the outcome must be observed rather than assumed.
    #[must_use]
    pub const fn is_ambiguous(&self) -> bool {
        matches!(self, Self::Malformed(_)) || self.is_retryable()
    }
}

/// Client bound to one orchestrator cluster.
pub trait OrchestratorClient: Send + Sync {
    /// Lists runs started at or after `since`, newest first, at most `limit`.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError`] when the cluster cannot be queried.
    fn list_recent_runs(
        &self,
        since: Timestamp,
        limit: usize,
    ) -> Result<Vec<ExternalRun>, OrchestratorError>;

    /// Submits a run of `workflow` using `run_id` as the requested external id.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError`] when submission fails.
    fn trigger_run(
        &self,
        workflow: &WorkflowName,
        run_id: &RunId,
    ) -> Result<ExternalRun, OrchestratorError>;

    /// Requests that an external run stop.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError`] when the request fails.
    fn stop_run(
        &self,
        workflow: &WorkflowName,
        external_id: &ExternalRunId,
    ) -> Result<(), OrchestratorError>;

    /// Pauses or unpauses a workflow's schedule.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError`] when the request fails.
    fn set_paused(&self, workflow: &WorkflowName, paused: bool) -> Result<(), OrchestratorError>;
}

/// Builds orchestrator clients for clusters.
pub trait OrchestratorConnector: Send + Sync {
    /// Creates a client bound to `cluster`.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError::Invalid`] when the cluster config is unusable.
    fn connect(
        &self,
        cluster: &ClusterConfig,
    ) -> Result<Box<dyn OrchestratorClient>, OrchestratorError>;
}

// ============================================================================
// SECTION: Clock
// ============================================================================

/// Source of the current time.
///
/// Hosts supply the wall clock; tests supply a controllable one.
pub trait Clock: Send + Sync {
    /// Returns the current time.
    fn now(&self) -> Timestamp;
}

// ============================================================================
// SECTION: Sync Observer
// ============================================================================

/// Per-item events emitted while reconciling runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SyncEvent {
    /// A local run was marked `UNKNOWN` by the staleness rule.
    RunMarkedStale {
        /// Owning cluster.
        team: TeamId,
        /// Local run id.
        run_id: RunId,
        /// Workflow name.
        workflow: WorkflowName,
        /// Status before marking.
        previous_status: String,
    },
    /// An external run was not adopted.
    ExternalRunSkipped {
        /// Cluster reporting the run.
        team: TeamId,
        /// External run id.
        external_id: ExternalRunId,
        /// External workflow id.
        workflow_id: String,
        /// Reason for skipping.
        reason: String,
    },
}

/// Receives per-item sync events.
pub trait SyncObserver: Send + Sync {
    /// Handles one event. Must not block for long.
    fn on_event(&self, event: &SyncEvent);
}

/// Observer that discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSyncObserver;

impl SyncObserver for NoopSyncObserver {
    fn on_event(&self, _event: &SyncEvent) {}
}
