// crates/workflow-sync-core/src/runtime/store.rs
// ============================================================================
// Module: In-Memory Stores
// Description: Mutex-backed registry, run store, cluster registry, and clock.
// Purpose: Provide deterministic port implementations without external deps.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! These implementations back the `memory` store mode and the engine tests.
//! They enforce the same uniqueness rules as the SQLite store.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicI64;
use std::sync::atomic::Ordering;
use std::time::Duration;

use crate::core::ClusterConfig;
use crate::core::ExecutionRun;
use crate::core::ExternalRunId;
use crate::core::RunId;
use crate::core::TeamId;
use crate::core::Timestamp;
use crate::core::WorkflowDefinition;
use crate::core::WorkflowName;
use crate::interfaces::Clock;
use crate::interfaces::ClusterRegistry;
use crate::interfaces::RegistryError;
use crate::interfaces::RunStore;
use crate::interfaces::StoreError;
use crate::interfaces::WorkflowRegistry;

// ============================================================================
// SECTION: Workflow Registry
// ============================================================================

/// In-memory workflow registry.
#[derive(Debug, Default, Clone)]
pub struct InMemoryWorkflowRegistry {
    /// Definitions keyed by name.
    definitions: Arc<Mutex<BTreeMap<String, WorkflowDefinition>>>,
}

impl InMemoryWorkflowRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl WorkflowRegistry for InMemoryWorkflowRegistry {
    fn get(&self, name: &WorkflowName) -> Result<Option<WorkflowDefinition>, StoreError> {
        let guard = self
            .definitions
            .lock()
            .map_err(|_| StoreError::Store("workflow registry mutex poisoned".to_string()))?;
        Ok(guard.get(name.as_str()).cloned())
    }

    fn upsert(&self, definition: &WorkflowDefinition) -> Result<(), StoreError> {
        self.definitions
            .lock()
            .map_err(|_| StoreError::Store("workflow registry mutex poisoned".to_string()))?
            .insert(definition.name.as_str().to_string(), definition.clone());
        Ok(())
    }

    fn list(&self) -> Result<Vec<WorkflowDefinition>, StoreError> {
        let guard = self
            .definitions
            .lock()
            .map_err(|_| StoreError::Store("workflow registry mutex poisoned".to_string()))?;
        Ok(guard.values().cloned().collect())
    }
}

// ============================================================================
// SECTION: Run Store
// ============================================================================

/// In-memory run store enforcing external id uniqueness.
#[derive(Debug, Default, Clone)]
pub struct InMemoryRunStore {
    /// Runs keyed by local id.
    runs: Arc<Mutex<BTreeMap<String, ExecutionRun>>>,
}

impl InMemoryRunStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every stored run ordered by local id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store mutex is poisoned.
    pub fn all(&self) -> Result<Vec<ExecutionRun>, StoreError> {
        let guard =
            self.runs.lock().map_err(|_| StoreError::Store("run store mutex poisoned".to_string()))?;
        Ok(guard.values().cloned().collect())
    }
}

/// Rejects `run` when another run already holds its external id.
fn check_external_unique(
    runs: &BTreeMap<String, ExecutionRun>,
    run: &ExecutionRun,
) -> Result<(), StoreError> {
    let Some(external_id) = &run.external_id else {
        return Ok(());
    };
    let taken = runs.values().any(|other| {
        other.run_id != run.run_id && other.external_id.as_ref() == Some(external_id)
    });
    if taken {
        return Err(StoreError::Conflict(format!("external run id {external_id} already recorded")));
    }
    Ok(())
}

impl RunStore for InMemoryRunStore {
    fn insert(&self, run: &ExecutionRun) -> Result<(), StoreError> {
        let mut guard =
            self.runs.lock().map_err(|_| StoreError::Store("run store mutex poisoned".to_string()))?;
        if guard.contains_key(run.run_id.as_str()) {
            return Err(StoreError::Conflict(format!("run {} already exists", run.run_id)));
        }
        check_external_unique(&guard, run)?;
        guard.insert(run.run_id.as_str().to_string(), run.clone());
        Ok(())
    }

    fn update(&self, run: &ExecutionRun) -> Result<(), StoreError> {
        let mut guard =
            self.runs.lock().map_err(|_| StoreError::Store("run store mutex poisoned".to_string()))?;
        if !guard.contains_key(run.run_id.as_str()) {
            return Err(StoreError::NotFound(format!("run {}", run.run_id)));
        }
        check_external_unique(&guard, run)?;
        guard.insert(run.run_id.as_str().to_string(), run.clone());
        Ok(())
    }

    fn get(&self, run_id: &RunId) -> Result<Option<ExecutionRun>, StoreError> {
        let guard =
            self.runs.lock().map_err(|_| StoreError::Store("run store mutex poisoned".to_string()))?;
        Ok(guard.get(run_id.as_str()).cloned())
    }

    fn find_by_external_id(
        &self,
        external_id: &ExternalRunId,
    ) -> Result<Option<ExecutionRun>, StoreError> {
        let guard =
            self.runs.lock().map_err(|_| StoreError::Store("run store mutex poisoned".to_string()))?;
        Ok(guard.values().find(|run| run.external_id.as_ref() == Some(external_id)).cloned())
    }

    fn list_open_for_team(
        &self,
        team: &TeamId,
        since: Timestamp,
    ) -> Result<Vec<ExecutionRun>, StoreError> {
        let guard =
            self.runs.lock().map_err(|_| StoreError::Store("run store mutex poisoned".to_string()))?;
        Ok(guard
            .values()
            .filter(|run| {
                &run.team == team && !run.status.is_terminal() && run.reference_time() >= since
            })
            .cloned()
            .collect())
    }
}

// ============================================================================
// SECTION: Cluster Registry
// ============================================================================

/// Fixed cluster registry built from configuration.
#[derive(Debug, Default, Clone)]
pub struct StaticClusterRegistry {
    /// Configured clusters ordered by team.
    clusters: Vec<ClusterConfig>,
}

impl StaticClusterRegistry {
    /// Creates a registry from `clusters`.
    #[must_use]
    pub fn new(mut clusters: Vec<ClusterConfig>) -> Self {
        clusters.sort_by(|left, right| left.team.cmp(&right.team));
        Self {
            clusters,
        }
    }
}

impl ClusterRegistry for StaticClusterRegistry {
    fn resolve_for_team(&self, team: &TeamId) -> Result<ClusterConfig, RegistryError> {
        self.clusters
            .iter()
            .find(|cluster| cluster.active && &cluster.team == team)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(team.clone()))
    }

    fn list_active(&self) -> Result<Vec<ClusterConfig>, RegistryError> {
        Ok(self.clusters.iter().filter(|cluster| cluster.active).cloned().collect())
    }
}

// ============================================================================
// SECTION: Manual Clock
// ============================================================================

/// Clock that only moves when told to.
#[derive(Debug, Default, Clone)]
pub struct ManualClock {
    /// Current time in unix milliseconds.
    millis: Arc<AtomicI64>,
}

impl ManualClock {
    /// Creates a clock fixed at `now`.
    #[must_use]
    pub fn new(now: Timestamp) -> Self {
        Self {
            millis: Arc::new(AtomicI64::new(now.as_unix_millis())),
        }
    }

    /// Sets the current time.
    pub fn set(&self, now: Timestamp) {
        self.millis.store(now.as_unix_millis(), Ordering::SeqCst);
    }

    /// Moves the clock forward.
    pub fn advance(&self, by: Duration) {
        let next = self.now().saturating_add(by);
        self.set(next);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        Timestamp::from_unix_millis(self.millis.load(Ordering::SeqCst))
    }
}
