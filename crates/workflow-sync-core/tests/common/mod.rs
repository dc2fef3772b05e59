// crates/workflow-sync-core/tests/common/mod.rs
// ============================================================================
// Module: Test Fakes
// Description: Scripted blob store and orchestrator fakes for engine tests.
// ============================================================================
//! ## Overview
//! Fakes record calls and return scripted results so engine tests can drive
//! failure isolation and reconciliation scenarios deterministically.

#![allow(dead_code, reason = "Shared helpers are used by a subset of test binaries.")]
#![allow(clippy::unwrap_used, reason = "Test-only helpers use unwrap on fixtures.")]

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;

use workflow_sync_core::BlobStore;
use workflow_sync_core::BlobStoreError;
use workflow_sync_core::ClusterConfig;
use workflow_sync_core::ClusterCredential;
use workflow_sync_core::ExternalRun;
use workflow_sync_core::ExternalRunId;
use workflow_sync_core::ExternalRunState;
use workflow_sync_core::OrchestratorClient;
use workflow_sync_core::OrchestratorConnector;
use workflow_sync_core::OrchestratorError;
use workflow_sync_core::RunId;
use workflow_sync_core::SyncEvent;
use workflow_sync_core::SyncObserver;
use workflow_sync_core::TeamId;
use workflow_sync_core::Timestamp;
use workflow_sync_core::WorkflowName;

/// Fixed base time for scenarios: 2024-06-01T00:00:00Z.
pub const BASE_MILLIS: i64 = 1_717_200_000_000;

/// Returns `BASE_MILLIS` shifted by `minutes`.
pub fn at_minutes(minutes: i64) -> Timestamp {
    Timestamp::from_unix_millis(BASE_MILLIS + minutes * 60_000)
}

/// Builds an active cluster config for `team`.
pub fn cluster(team: &str) -> ClusterConfig {
    ClusterConfig {
        team: TeamId::new(team),
        endpoint: format!("http://{team}.orchestrator.test"),
        credential: ClusterCredential::None,
        active: true,
    }
}

/// Builds an external run observation.
pub fn external(id: &str, workflow: &str, state: &str, started: Option<Timestamp>) -> ExternalRun {
    ExternalRun {
        external_id: ExternalRunId::new(id),
        workflow_id: workflow.to_string(),
        state: ExternalRunState::parse(state),
        started_at: started,
        ended_at: None,
        note: None,
    }
}

// ============================================================================
// SECTION: Blob Store
// ============================================================================

/// In-memory blob store with injectable failures.
#[derive(Default)]
pub struct FakeBlobStore {
    /// Objects keyed by path.
    pub objects: Mutex<BTreeMap<String, Vec<u8>>>,
    /// Paths whose reads fail.
    pub unreadable: Mutex<Vec<String>>,
    /// When set, listing fails with this message.
    pub list_error: Mutex<Option<String>>,
}

impl FakeBlobStore {
    /// Stores `content` at `path`.
    pub fn put(&self, path: &str, content: &str) {
        self.objects.lock().unwrap().insert(path.to_string(), content.as_bytes().to_vec());
    }
}

impl BlobStore for FakeBlobStore {
    fn list_spec_files(&self, prefix: &str) -> Result<Vec<String>, BlobStoreError> {
        if let Some(message) = self.list_error.lock().unwrap().clone() {
            return Err(BlobStoreError::Backend(message));
        }
        Ok(self
            .objects
            .lock()
            .unwrap()
            .keys()
            .filter(|path| path.starts_with(prefix))
            .cloned()
            .collect())
    }

    fn read_spec_file(&self, path: &str) -> Result<Vec<u8>, BlobStoreError> {
        if self.unreadable.lock().unwrap().iter().any(|bad| bad == path) {
            return Err(BlobStoreError::Backend(format!("read of {path} timed out")));
        }
        self.objects
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| BlobStoreError::NotFound(path.to_string()))
    }
}

// ============================================================================
// SECTION: Orchestrator
// ============================================================================

/// Scripted behavior for one cluster.
#[derive(Clone, Default)]
pub struct ClusterScript {
    /// Runs returned by listing.
    pub runs: Vec<ExternalRun>,
    /// When set, every call fails with this error.
    pub failure: Option<OrchestratorError>,
}

/// Calls recorded by the fake orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    /// `list_recent_runs(since, limit)`.
    List(String, Timestamp, usize),
    /// `trigger_run(workflow, run_id)`.
    Trigger(String, String),
    /// `stop_run(workflow, external_id)`.
    Stop(String, String),
    /// `set_paused(workflow, paused)`.
    Pause(String, bool),
}

/// Connector handing out scripted clients keyed by team.
#[derive(Clone, Default)]
pub struct FakeConnector {
    /// Scripts keyed by team.
    pub scripts: Arc<Mutex<BTreeMap<String, ClusterScript>>>,
    /// Calls across all clusters.
    pub calls: Arc<Mutex<Vec<Call>>>,
}

impl FakeConnector {
    /// Replaces the script for `team`.
    pub fn script(&self, team: &str, script: ClusterScript) {
        self.scripts.lock().unwrap().insert(team.to_string(), script);
    }

    /// Returns recorded calls.
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }
}

/// Client bound to one scripted cluster.
struct FakeClient {
    /// Cluster team.
    team: String,
    /// Shared connector state.
    connector: FakeConnector,
}

impl FakeClient {
    /// Returns the current script for this client's team.
    fn script(&self) -> ClusterScript {
        self.connector.scripts.lock().unwrap().get(&self.team).cloned().unwrap_or_default()
    }

    /// Records a call and returns the scripted failure, if any.
    fn record(&self, call: Call) -> Result<ClusterScript, OrchestratorError> {
        self.connector.calls.lock().unwrap().push(call);
        let script = self.script();
        match &script.failure {
            Some(err) => Err(err.clone()),
            None => Ok(script),
        }
    }
}

impl OrchestratorClient for FakeClient {
    fn list_recent_runs(
        &self,
        since: Timestamp,
        limit: usize,
    ) -> Result<Vec<ExternalRun>, OrchestratorError> {
        let script = self.record(Call::List(self.team.clone(), since, limit))?;
        Ok(script.runs.into_iter().take(limit).collect())
    }

    fn trigger_run(
        &self,
        workflow: &WorkflowName,
        run_id: &RunId,
    ) -> Result<ExternalRun, OrchestratorError> {
        self.record(Call::Trigger(workflow.to_string(), run_id.to_string()))?;
        Ok(ExternalRun {
            external_id: ExternalRunId::new(run_id.as_str()),
            workflow_id: workflow.to_string(),
            state: ExternalRunState::Queued,
            started_at: None,
            ended_at: None,
            note: None,
        })
    }

    fn stop_run(
        &self,
        workflow: &WorkflowName,
        external_id: &ExternalRunId,
    ) -> Result<(), OrchestratorError> {
        self.record(Call::Stop(workflow.to_string(), external_id.to_string()))?;
        Ok(())
    }

    fn set_paused(&self, workflow: &WorkflowName, paused: bool) -> Result<(), OrchestratorError> {
        self.record(Call::Pause(workflow.to_string(), paused))?;
        Ok(())
    }
}

impl OrchestratorConnector for FakeConnector {
    fn connect(
        &self,
        cluster: &ClusterConfig,
    ) -> Result<Box<dyn OrchestratorClient>, OrchestratorError> {
        Ok(Box::new(FakeClient {
            team: cluster.team.to_string(),
            connector: self.clone(),
        }))
    }
}

// ============================================================================
// SECTION: Observer
// ============================================================================

/// Observer that keeps every event.
#[derive(Default)]
pub struct RecordingObserver {
    /// Events in emission order.
    pub events: Mutex<Vec<SyncEvent>>,
}

impl SyncObserver for RecordingObserver {
    fn on_event(&self, event: &SyncEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}
