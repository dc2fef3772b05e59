// crates/workflow-sync-server/src/service.rs
// ============================================================================
// Module: Sync Service
// Description: Guarded entry points for sync passes and workflow control.
// Purpose: Give timers, the admin API, and the CLI one audited surface.
// Dependencies: workflow-sync-core
// ============================================================================

//! ## Overview
//! [`SyncService`] owns one single-flight guard per sync kind. A trigger that
//! finds its guard taken is refused with [`ServiceError::SyncInProgress`] and
//! audited as `sync_rejected`; the caller decides whether that is an error
//! (manual) or a skipped tick (timer). All methods block and must run on a
//! blocking-capable thread.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use thiserror::Error;
use workflow_sync_core::AggregateSyncOutcome;
use workflow_sync_core::ClusterSyncOutcome;
use workflow_sync_core::ControlError;
use workflow_sync_core::ExecutionRun;
use workflow_sync_core::RegisterRequest;
use workflow_sync_core::RegistryError;
use workflow_sync_core::RunId;
use workflow_sync_core::RunReconciler;
use workflow_sync_core::SpecSyncEngine;
use workflow_sync_core::SyncOutcome;
use workflow_sync_core::TeamId;
use workflow_sync_core::WorkflowControl;
use workflow_sync_core::WorkflowDefinition;
use workflow_sync_core::WorkflowName;

use crate::audit::SyncAuditEvent;
use crate::audit::SyncAuditSink;
use crate::guard::SyncGuard;
use crate::guard::SyncKind;
use crate::guard::SyncLease;
use crate::guard::SyncTrigger;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Service-level failures.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// A pass of the same kind is already running.
    #[error("{0} sync already running")]
    SyncInProgress(SyncKind),
    /// The sync kind is disabled by configuration.
    #[error("{0} sync is disabled")]
    Disabled(SyncKind),
    /// Cluster lookup failed.
    #[error(transparent)]
    Cluster(#[from] RegistryError),
    /// Workflow control failed.
    #[error(transparent)]
    Control(#[from] ControlError),
}

// ============================================================================
// SECTION: Service
// ============================================================================

/// Components assembled into a [`SyncService`].
pub struct SyncServiceParts {
    /// Spec sync engine; `None` disables spec sync.
    pub spec_engine: Option<SpecSyncEngine>,
    /// Run reconciler; `None` disables run sync.
    pub reconciler: Option<RunReconciler>,
    /// Workflow control surface.
    pub control: WorkflowControl,
    /// Audit destination.
    pub audit: Arc<dyn SyncAuditSink>,
}

/// Guarded sync and control operations.
pub struct SyncService {
    /// Spec sync engine.
    spec_engine: Option<SpecSyncEngine>,
    /// Run reconciler.
    reconciler: Option<RunReconciler>,
    /// Workflow control surface.
    control: WorkflowControl,
    /// Audit destination.
    audit: Arc<dyn SyncAuditSink>,
    /// Single-flight token for spec sync.
    spec_guard: SyncGuard,
    /// Single-flight token for run sync, shared by single-cluster passes.
    run_guard: SyncGuard,
}

impl SyncService {
    /// Assembles a service from its parts.
    #[must_use]
    pub fn new(parts: SyncServiceParts) -> Self {
        Self {
            spec_engine: parts.spec_engine,
            reconciler: parts.reconciler,
            control: parts.control,
            audit: parts.audit,
            spec_guard: SyncGuard::new(),
            run_guard: SyncGuard::new(),
        }
    }

    /// Returns true when a pass of `kind` is running.
    #[must_use]
    pub fn is_running(&self, kind: SyncKind) -> bool {
        match kind {
            SyncKind::Specs => self.spec_guard.is_running(),
            SyncKind::Runs => self.run_guard.is_running(),
        }
    }

    /// Returns true when `kind` is enabled.
    #[must_use]
    pub const fn is_enabled(&self, kind: SyncKind) -> bool {
        match kind {
            SyncKind::Specs => self.spec_engine.is_some(),
            SyncKind::Runs => self.reconciler.is_some(),
        }
    }

    /// Runs one spec sync pass.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::SyncInProgress`] when a spec pass is running
    /// and [`ServiceError::Disabled`] when spec sync is off.
    pub fn trigger_spec_sync(&self, trigger: SyncTrigger) -> Result<SyncOutcome, ServiceError> {
        let engine = self.spec_engine.as_ref().ok_or(ServiceError::Disabled(SyncKind::Specs))?;
        let _lease = self.acquire(&self.spec_guard, SyncKind::Specs, trigger)?;
        let outcome = engine.sync_specs();
        self.audit.record(&SyncAuditEvent::spec_sync_completed(trigger, &outcome));
        Ok(outcome)
    }

    /// Reconciles every active cluster.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::SyncInProgress`] when a run pass is running
    /// and [`ServiceError::Disabled`] when run sync is off.
    pub fn trigger_run_sync(
        &self,
        trigger: SyncTrigger,
    ) -> Result<AggregateSyncOutcome, ServiceError> {
        let reconciler = self.reconciler.as_ref().ok_or(ServiceError::Disabled(SyncKind::Runs))?;
        let _lease = self.acquire(&self.run_guard, SyncKind::Runs, trigger)?;
        let outcome = reconciler.sync_all_clusters();
        for cluster in &outcome.clusters {
            self.audit.record(&SyncAuditEvent::cluster_sync_completed(trigger, cluster));
        }
        self.audit.record(&SyncAuditEvent::run_sync_completed(trigger, &outcome));
        Ok(outcome)
    }

    /// Reconciles the cluster owned by `team`.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Cluster`] when the team has no active cluster,
    /// plus the guard and disabled errors of [`Self::trigger_run_sync`].
    pub fn trigger_cluster_run_sync(
        &self,
        team: &TeamId,
        trigger: SyncTrigger,
    ) -> Result<ClusterSyncOutcome, ServiceError> {
        let reconciler = self.reconciler.as_ref().ok_or(ServiceError::Disabled(SyncKind::Runs))?;
        let _lease = self.acquire(&self.run_guard, SyncKind::Runs, trigger)?;
        let outcome = reconciler.sync_cluster(team)?;
        self.audit.record(&SyncAuditEvent::cluster_sync_completed(trigger, &outcome));
        Ok(outcome)
    }

    /// Creates and submits a run of `name`.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Control`] when the control operation fails.
    pub fn trigger_run(&self, name: &WorkflowName) -> Result<ExecutionRun, ServiceError> {
        self.audited("trigger_run", name.as_str(), self.control.trigger_run(name))
    }

    /// Requests that a run stop.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Control`] when the control operation fails.
    pub fn stop_run(&self, run_id: &RunId) -> Result<ExecutionRun, ServiceError> {
        self.audited("stop_run", run_id.as_str(), self.control.stop_run(run_id))
    }

    /// Pauses a workflow.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Control`] when the control operation fails.
    pub fn pause(&self, name: &WorkflowName) -> Result<WorkflowDefinition, ServiceError> {
        self.audited("pause", name.as_str(), self.control.pause(name))
    }

    /// Unpauses a workflow.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Control`] when the control operation fails.
    pub fn unpause(&self, name: &WorkflowName) -> Result<WorkflowDefinition, ServiceError> {
        self.audited("unpause", name.as_str(), self.control.unpause(name))
    }

    /// Registers a manual workflow definition.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Control`] when the control operation fails.
    pub fn register(&self, request: RegisterRequest) -> Result<WorkflowDefinition, ServiceError> {
        let target = request.name.clone();
        self.audited("register", target.as_str(), self.control.register(request))
    }

    /// Soft-deletes a workflow definition.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Control`] when the control operation fails.
    pub fn unregister(&self, name: &WorkflowName) -> Result<WorkflowDefinition, ServiceError> {
        self.audited("unregister", name.as_str(), self.control.unregister(name))
    }

    /// Records a pass that died before reporting an outcome.
    pub fn record_aborted(&self, kind: SyncKind, trigger: SyncTrigger, reason: &str) {
        self.audit.record(&SyncAuditEvent::sync_aborted(kind, trigger, reason));
    }

    /// Takes `guard` or records the rejection.
    fn acquire<'a>(
        &self,
        guard: &'a SyncGuard,
        kind: SyncKind,
        trigger: SyncTrigger,
    ) -> Result<SyncLease<'a>, ServiceError> {
        guard.try_acquire().ok_or_else(|| {
            self.audit.record(&SyncAuditEvent::sync_rejected(kind, trigger));
            ServiceError::SyncInProgress(kind)
        })
    }

    /// Audits a control result and converts its error.
    fn audited<T>(
        &self,
        action: &'static str,
        target: &str,
        result: Result<T, ControlError>,
    ) -> Result<T, ServiceError> {
        let error = result.as_ref().err().map(ToString::to_string);
        self.audit.record(&SyncAuditEvent::workflow_control(action, target, error));
        result.map_err(ServiceError::from)
    }
}
