// crates/workflow-sync-server/tests/common/mod.rs
// ============================================================================
// Module: Server Test Fixtures
// Description: In-memory ports and a recording audit sink for service tests.
// ============================================================================
//! ## Overview
//! Builds a [`SyncService`] over in-memory stores, a scripted blob store that
//! can hold a pass open, and an orchestrator fake.

#![allow(dead_code, reason = "Shared helpers are used by a subset of test binaries.")]
#![allow(
    clippy::panic,
    clippy::unwrap_used,
    reason = "Test-only helpers use unwrap on fixtures and simulate crashing passes."
)]

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::mpsc;

use workflow_sync_core::BlobStore;
use workflow_sync_core::BlobStoreError;
use workflow_sync_core::ClusterConfig;
use workflow_sync_core::ClusterCredential;
use workflow_sync_core::ExternalRun;
use workflow_sync_core::ExternalRunId;
use workflow_sync_core::ExternalRunState;
use workflow_sync_core::InMemoryRunStore;
use workflow_sync_core::InMemoryWorkflowRegistry;
use workflow_sync_core::ManualClock;
use workflow_sync_core::OrchestratorClient;
use workflow_sync_core::OrchestratorConnector;
use workflow_sync_core::OrchestratorError;
use workflow_sync_core::RunId;
use workflow_sync_core::RunReconciler;
use workflow_sync_core::RunSyncConfig;
use workflow_sync_core::SpecSyncConfig;
use workflow_sync_core::SpecSyncEngine;
use workflow_sync_core::StaticClusterRegistry;
use workflow_sync_core::TeamId;
use workflow_sync_core::Timestamp;
use workflow_sync_core::WorkflowControl;
use workflow_sync_core::WorkflowName;
use workflow_sync_server::AuditObserver;
use workflow_sync_server::SyncAuditEvent;
use workflow_sync_server::SyncAuditSink;
use workflow_sync_server::SyncService;
use workflow_sync_server::SyncServiceParts;

/// Fixed test time: 2024-06-01T08:00:00Z.
pub const NOW_MILLIS: i64 = 1_717_228_800_000;

/// Spec file body for `name` owned by `team_a`.
#[must_use]
pub fn spec(name: &str, cron: &str) -> String {
    format!("name: {name}\nteam: team_a\nschedule:\n  cron: \"{cron}\"\n")
}

// ============================================================================
// SECTION: Audit
// ============================================================================

/// Audit sink that keeps every event in memory.
#[derive(Default)]
pub struct MemoryAuditSink {
    /// Recorded events.
    pub events: Mutex<Vec<SyncAuditEvent>>,
}

impl MemoryAuditSink {
    /// Returns recorded event names in order.
    pub fn names(&self) -> Vec<&'static str> {
        self.events.lock().unwrap().iter().map(|event| event.event).collect()
    }
}

impl SyncAuditSink for MemoryAuditSink {
    fn record(&self, event: &SyncAuditEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

// ============================================================================
// SECTION: Blob Store
// ============================================================================

/// Blob store over a map, optionally holding listings open until released.
#[derive(Default)]
pub struct GatedBlobStore {
    /// Stored spec files.
    pub objects: Mutex<BTreeMap<String, Vec<u8>>>,
    /// When set, listing signals entry and waits for release.
    gate: Mutex<Option<(mpsc::Sender<()>, mpsc::Receiver<()>)>>,
    /// When set, listing panics.
    crash: AtomicBool,
}

impl GatedBlobStore {
    /// Adds a spec file.
    pub fn put(&self, path: &str, content: &str) {
        self.objects.lock().unwrap().insert(path.to_string(), content.as_bytes().to_vec());
    }

    /// Makes the next listing block. Returns `(entered, release)`.
    pub fn hold(&self) -> (mpsc::Receiver<()>, mpsc::Sender<()>) {
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        *self.gate.lock().unwrap() = Some((entered_tx, release_rx));
        (entered_rx, release_tx)
    }

    /// Makes every later listing panic.
    pub fn crash_on_list(&self) {
        self.crash.store(true, Ordering::SeqCst);
    }
}

impl BlobStore for GatedBlobStore {
    fn list_spec_files(&self, prefix: &str) -> Result<Vec<String>, BlobStoreError> {
        if self.crash.load(Ordering::SeqCst) {
            panic!("blob listing crashed");
        }
        let gate = self.gate.lock().unwrap().take();
        if let Some((entered, release)) = gate {
            entered.send(()).unwrap();
            release.recv().unwrap();
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

/// Orchestrator fake reporting the same runs for every cluster.
#[derive(Clone, Default)]
pub struct FakeConnector {
    /// Runs reported by every cluster.
    pub runs: Arc<Mutex<Vec<ExternalRun>>>,
}

/// Client handed out by [`FakeConnector`].
struct FakeClient {
    /// Runs to report.
    runs: Vec<ExternalRun>,
}

impl OrchestratorClient for FakeClient {
    fn list_recent_runs(
        &self,
        _since: Timestamp,
        limit: usize,
    ) -> Result<Vec<ExternalRun>, OrchestratorError> {
        Ok(self.runs.iter().take(limit).cloned().collect())
    }

    fn trigger_run(
        &self,
        workflow: &WorkflowName,
        run_id: &RunId,
    ) -> Result<ExternalRun, OrchestratorError> {
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
        _workflow: &WorkflowName,
        _external_id: &ExternalRunId,
    ) -> Result<(), OrchestratorError> {
        Ok(())
    }

    fn set_paused(&self, _workflow: &WorkflowName, _paused: bool) -> Result<(), OrchestratorError> {
        Ok(())
    }
}

impl OrchestratorConnector for FakeConnector {
    fn connect(
        &self,
        _cluster: &ClusterConfig,
    ) -> Result<Box<dyn OrchestratorClient>, OrchestratorError> {
        Ok(Box::new(FakeClient {
            runs: self.runs.lock().unwrap().clone(),
        }))
    }
}

// ============================================================================
// SECTION: Harness
// ============================================================================

/// Service plus handles on its fakes.
pub struct Harness {
    /// Service under test.
    pub service: Arc<SyncService>,
    /// Spec files.
    pub blobs: Arc<GatedBlobStore>,
    /// Orchestrator fake.
    pub connector: FakeConnector,
    /// Local runs.
    pub runs: Arc<InMemoryRunStore>,
    /// Audit records.
    pub audit: Arc<MemoryAuditSink>,
}

/// Options for [`harness`].
#[derive(Clone, Copy)]
pub struct HarnessOptions {
    /// Build the spec sync engine.
    pub spec_sync: bool,
    /// Build the run reconciler.
    pub run_sync: bool,
}

impl Default for HarnessOptions {
    fn default() -> Self {
        Self {
            spec_sync: true,
            run_sync: true,
        }
    }
}

/// Builds a service with one active cluster for `team_a`.
#[must_use]
pub fn harness(options: HarnessOptions) -> Harness {
    let blobs = Arc::new(GatedBlobStore::default());
    let connector = FakeConnector::default();
    let runs = Arc::new(InMemoryRunStore::new());
    let registry = Arc::new(InMemoryWorkflowRegistry::new());
    let audit = Arc::new(MemoryAuditSink::default());
    let clock = Arc::new(ManualClock::new(Timestamp::from_unix_millis(NOW_MILLIS)));
    let clusters = Arc::new(StaticClusterRegistry::new(vec![ClusterConfig {
        team: TeamId::new("team_a"),
        endpoint: "https://team-a.orchestrator.test".to_string(),
        credential: ClusterCredential::None,
        active: true,
    }]));

    let spec_engine = options.spec_sync.then(|| {
        SpecSyncEngine::new(
            blobs.clone(),
            registry.clone(),
            clock.clone(),
            SpecSyncConfig::default(),
        )
    });
    let reconciler = options.run_sync.then(|| {
        RunReconciler::new(
            clusters.clone(),
            Arc::new(connector.clone()),
            runs.clone(),
            registry.clone(),
            clock.clone(),
            Arc::new(AuditObserver::new(audit.clone())),
            RunSyncConfig::default(),
        )
    });
    let control = WorkflowControl::new(
        registry,
        runs.clone(),
        clusters,
        Arc::new(connector.clone()),
        clock,
    );
    let service = Arc::new(SyncService::new(SyncServiceParts {
        spec_engine,
        reconciler,
        control,
        audit: audit.clone(),
    }));
    Harness {
        service,
        blobs,
        connector,
        runs,
        audit,
    }
}
