// crates/workflow-sync-core/src/runtime/control.rs
// ============================================================================
// Module: Workflow Control
// Description: Trigger, stop, pause, and registration operations.
// Purpose: Drive orchestrators and the registry from explicit requests.
// Dependencies: crate::{core, interfaces}, serde, thiserror
// ============================================================================

//! ## Overview
//! [`WorkflowControl`] is the triggering side of the system: it creates the
//! local runs the reconciler later converges, moves runs into `STOPPING`,
//! and manages manual registrations. `CODE` definitions cannot be replaced
//! by manual registration while live.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::DefinitionOrigin;
use crate::core::DefinitionStatus;
use crate::core::ExecutionRun;
use crate::core::ExternalRunId;
use crate::core::RunId;
use crate::core::RunStatus;
use crate::core::Schedule;
use crate::core::TeamId;
use crate::core::WorkflowDefinition;
use crate::core::WorkflowName;
use crate::core::next_status;
use crate::core::spec::validate_identifier;
use crate::core::spec::validate_schedule;
use crate::interfaces::Clock;
use crate::interfaces::ClusterRegistry;
use crate::interfaces::OrchestratorConnector;
use crate::interfaces::OrchestratorError;
use crate::interfaces::RegistryError;
use crate::interfaces::RunStore;
use crate::interfaces::StoreError;
use crate::interfaces::WorkflowRegistry;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Workflow control failures.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum ControlError {
    /// Workflow or run does not exist.
    #[error("not found: {0}")]
    NotFound(String),
    /// Request conflicts with current state.
    #[error("conflict: {0}")]
    Conflict(String),
    /// Request is malformed.
    #[error("invalid request: {0}")]
    Invalid(String),
    /// Cluster lookup failed.
    #[error(transparent)]
    Cluster(#[from] RegistryError),
    /// Orchestrator call failed.
    #[error(transparent)]
    Orchestrator(#[from] OrchestratorError),
    /// Local store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

// ============================================================================
// SECTION: Requests
// ============================================================================

/// Manual registration request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    /// Workflow name.
    pub name: WorkflowName,
    /// Owning team.
    pub team: TeamId,
    /// Optional description.
    #[serde(default)]
    pub description: Option<String>,
    /// Cron schedule.
    pub schedule: Schedule,
}

// ============================================================================
// SECTION: Control
// ============================================================================

/// Explicit workflow and run operations.
#[derive(Clone)]
pub struct WorkflowControl {
    /// Definition registry.
    registry: Arc<dyn WorkflowRegistry>,
    /// Local run history.
    runs: Arc<dyn RunStore>,
    /// Cluster lookup.
    clusters: Arc<dyn ClusterRegistry>,
    /// Orchestrator client factory.
    connector: Arc<dyn OrchestratorConnector>,
    /// Time source.
    clock: Arc<dyn Clock>,
}

impl WorkflowControl {
    /// Creates a control surface over the given ports.
    #[must_use]
    pub fn new(
        registry: Arc<dyn WorkflowRegistry>,
        runs: Arc<dyn RunStore>,
        clusters: Arc<dyn ClusterRegistry>,
        connector: Arc<dyn OrchestratorConnector>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            registry,
            runs,
            clusters,
            connector,
            clock,
        }
    }

    /// Creates a `PENDING` run and submits it to the owning cluster.
    ///
    /// When the orchestrator definitively rejects the submission the local
    /// run is recorded as `FAILED`. Timeouts, transport failures, and
    /// retryable statuses leave it `PENDING` with its external id set, so a
    /// later reconcile pass settles it. The orchestrator error is returned
    /// in both cases.
    ///
    /// # Errors
    ///
    /// Returns [`ControlError`] when the workflow is missing or not active,
    /// the cluster cannot be resolved, or submission fails.
    pub fn trigger_run(&self, name: &WorkflowName) -> Result<ExecutionRun, ControlError> {
        let definition = self.live_definition(name)?;
        if definition.status != DefinitionStatus::Active {
            return Err(ControlError::Conflict(format!(
                "workflow {name} is {}",
                definition.status.as_str()
            )));
        }
        let cluster = self.clusters.resolve_for_team(&definition.team)?;
        let now = self.clock.now();
        let mut run = ExecutionRun {
            run_id: RunId::generate(now.as_unix_millis()),
            external_id: None,
            workflow: definition.name.clone(),
            team: definition.team.clone(),
            status: RunStatus::Pending,
            created_at: now,
            started_at: None,
            ended_at: None,
            last_synced_at: None,
            progress: None,
        };
        self.runs.insert(&run)?;

        let client = match self.connector.connect(&cluster) {
            Ok(client) => client,
            Err(err) => return Err(self.record_rejection(run, err)),
        };
        match client.trigger_run(&definition.name, &run.run_id) {
            Ok(external) => {
                run.external_id = Some(external.external_id);
                run.status = next_status(RunStatus::Pending, &external.state);
                run.started_at = external.started_at;
                run.progress = external.note;
                run.last_synced_at = Some(self.clock.now());
                self.runs.update(&run)?;
                Ok(run)
            }
            Err(err) if err.is_ambiguous() => {
                // Submissions carry the local run id as the external id, so
                // the reconciler can match the run or age it into UNKNOWN.
                run.external_id = Some(ExternalRunId::new(run.run_id.as_str()));
                run.progress = Some(format!("submission unconfirmed: {err}"));
                self.runs.update(&run)?;
                Err(err.into())
            }
            Err(err) => Err(self.record_rejection(run, err)),
        }
    }

    /// Records a definitively rejected submission as `FAILED`.
    fn record_rejection(&self, mut run: ExecutionRun, err: OrchestratorError) -> ControlError {
        run.status = RunStatus::Failed;
        run.ended_at = Some(self.clock.now());
        run.progress = Some(format!("submission failed: {err}"));
        match self.runs.update(&run) {
            Ok(()) => err.into(),
            Err(store) => store.into(),
        }
    }

    /// Moves a `PENDING` or `RUNNING` run to `STOPPING`.
    ///
    /// Runs never submitted to an orchestrator stop immediately.
    ///
    /// # Errors
    ///
    /// Returns [`ControlError`] when the run is unknown, already settled, or
    /// the orchestrator rejects the stop.
    pub fn stop_run(&self, run_id: &RunId) -> Result<ExecutionRun, ControlError> {
        let mut run = self
            .runs
            .get(run_id)?
            .ok_or_else(|| ControlError::NotFound(format!("run {run_id}")))?;
        if !matches!(run.status, RunStatus::Pending | RunStatus::Running) {
            return Err(ControlError::Conflict(format!(
                "run {run_id} is {}",
                run.status.as_str()
            )));
        }
        if let Some(external_id) = &run.external_id {
            let cluster = self.clusters.resolve_for_team(&run.team)?;
            let client = self.connector.connect(&cluster)?;
            client.stop_run(&run.workflow, external_id)?;
            run.status = RunStatus::Stopping;
        } else {
            run.status = RunStatus::Stopped;
            run.ended_at = Some(self.clock.now());
        }
        self.runs.update(&run)?;
        Ok(run)
    }

    /// Pauses a workflow on its cluster and in the registry.
    ///
    /// # Errors
    ///
    /// Returns [`ControlError`] when the workflow is missing or disabled, or
    /// the orchestrator call fails.
    pub fn pause(&self, name: &WorkflowName) -> Result<WorkflowDefinition, ControlError> {
        self.set_paused(name, true)
    }

    /// Unpauses a workflow on its cluster and in the registry.
    ///
    /// # Errors
    ///
    /// Returns [`ControlError`] when the workflow is missing or disabled, or
    /// the orchestrator call fails.
    pub fn unpause(&self, name: &WorkflowName) -> Result<WorkflowDefinition, ControlError> {
        self.set_paused(name, false)
    }

    /// Shared pause/unpause path.
    fn set_paused(
        &self,
        name: &WorkflowName,
        paused: bool,
    ) -> Result<WorkflowDefinition, ControlError> {
        let mut definition = self.live_definition(name)?;
        if definition.status == DefinitionStatus::Disabled {
            return Err(ControlError::Conflict(format!("workflow {name} is DISABLED")));
        }
        let cluster = self.clusters.resolve_for_team(&definition.team)?;
        let client = self.connector.connect(&cluster)?;
        client.set_paused(name, paused)?;
        definition.status =
            if paused { DefinitionStatus::Paused } else { DefinitionStatus::Active };
        definition.updated_at = self.clock.now();
        self.registry.upsert(&definition)?;
        Ok(definition)
    }

    /// Registers or replaces a `MANUAL` definition.
    ///
    /// # Errors
    ///
    /// Returns [`ControlError::Conflict`] when a live `CODE` definition owns
    /// the name and [`ControlError::Invalid`] for malformed input.
    pub fn register(&self, request: RegisterRequest) -> Result<WorkflowDefinition, ControlError> {
        validate_identifier("name", request.name.as_str())
            .and_then(|()| validate_identifier("team", request.team.as_str()))
            .and_then(|()| validate_schedule(&request.schedule))
            .map_err(|err| ControlError::Invalid(err.to_string()))?;
        let existing = self.registry.get(&request.name)?;
        if let Some(current) = &existing
            && current.is_live()
            && current.origin == DefinitionOrigin::Code
        {
            return Err(ControlError::Conflict(format!(
                "workflow {} is defined by spec file {}",
                current.name,
                current.spec_path.as_deref().unwrap_or("<unknown>")
            )));
        }
        let now = self.clock.now();
        let created_at = existing
            .as_ref()
            .filter(|current| current.is_live())
            .map_or(now, |current| current.created_at);
        let definition = WorkflowDefinition {
            name: request.name,
            team: request.team,
            description: request.description,
            schedule: request.schedule,
            origin: DefinitionOrigin::Manual,
            spec_path: None,
            spec_digest: None,
            status: DefinitionStatus::Active,
            created_at,
            updated_at: now,
            deleted_at: None,
        };
        self.registry.upsert(&definition)?;
        Ok(definition)
    }

    /// Soft-deletes a definition.
    ///
    /// # Errors
    ///
    /// Returns [`ControlError::NotFound`] when no live definition exists.
    pub fn unregister(&self, name: &WorkflowName) -> Result<WorkflowDefinition, ControlError> {
        let mut definition = self.live_definition(name)?;
        let now = self.clock.now();
        definition.status = DefinitionStatus::Disabled;
        definition.deleted_at = Some(now);
        definition.updated_at = now;
        self.registry.upsert(&definition)?;
        Ok(definition)
    }

    /// Loads a definition that has not been unregistered.
    fn live_definition(&self, name: &WorkflowName) -> Result<WorkflowDefinition, ControlError> {
        self.registry
            .get(name)?
            .filter(WorkflowDefinition::is_live)
            .ok_or_else(|| ControlError::NotFound(format!("workflow {name}")))
    }
}
