// crates/workflow-sync-core/src/runtime/run_sync.rs
// ============================================================================
// Module: Run Reconciler
// Description: Merges orchestrator run history into local run records.
// Purpose: Converge local run status with every active cluster.
// Dependencies: crate::{core, interfaces}, thiserror
// ============================================================================

//! ## Overview
//! For each active cluster the reconciler fetches runs observed since the
//! look-back cutoff, applies the external-to-local status mapping to matched
//! runs, applies the adoption policy to unmatched ones, and marks local runs
//! that the cluster no longer reports as `UNKNOWN` once they are older than
//! the staleness threshold.
//!
//! Clusters are reconciled on scoped worker threads. A failing cluster only
//! affects its own [`ClusterSyncOutcome`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::thread;
use std::time::Duration;

use thiserror::Error;

use crate::core::AggregateSyncOutcome;
use crate::core::ClusterConfig;
use crate::core::ClusterSyncOutcome;
use crate::core::ExecutionRun;
use crate::core::ExternalRun;
use crate::core::ExternalRunId;
use crate::core::RunId;
use crate::core::RunStatus;
use crate::core::TeamId;
use crate::core::Timestamp;
use crate::core::WorkflowName;
use crate::core::next_status;
use crate::interfaces::Clock;
use crate::interfaces::ClusterRegistry;
use crate::interfaces::OrchestratorConnector;
use crate::interfaces::OrchestratorError;
use crate::interfaces::RegistryError;
use crate::interfaces::RunStore;
use crate::interfaces::StoreError;
use crate::interfaces::SyncEvent;
use crate::interfaces::SyncObserver;
use crate::interfaces::WorkflowRegistry;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Run reconciliation settings.
///
/// # Invariants
/// - `staleness < lookback`.
/// - `page_size > 0` and `max_parallel_clusters > 0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSyncConfig {
    /// How far back each pass looks.
    pub lookback: Duration,
    /// Age after which an unreported run is considered stale.
    pub staleness: Duration,
    /// Maximum runs fetched per cluster per pass.
    pub page_size: usize,
    /// Whether unmatched external runs become local runs.
    pub adopt_external_runs: bool,
    /// Maximum clusters reconciled concurrently.
    pub max_parallel_clusters: usize,
}

impl Default for RunSyncConfig {
    fn default() -> Self {
        Self {
            lookback: Duration::from_secs(24 * 60 * 60),
            staleness: Duration::from_secs(6 * 60 * 60),
            page_size: 500,
            adopt_external_runs: false,
            max_parallel_clusters: 4,
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Failures that abort one cluster's pass.
#[derive(Debug, Error)]
enum ClusterPassError {
    /// Orchestrator call failed.
    #[error(transparent)]
    Orchestrator(#[from] OrchestratorError),
    /// Local store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

// ============================================================================
// SECTION: Reconciler
// ============================================================================

/// Reconciles local run history against orchestrator clusters.
#[derive(Clone)]
pub struct RunReconciler {
    /// Cluster lookup.
    clusters: Arc<dyn ClusterRegistry>,
    /// Orchestrator client factory.
    connector: Arc<dyn OrchestratorConnector>,
    /// Local run history.
    runs: Arc<dyn RunStore>,
    /// Definition lookup for adoption.
    registry: Arc<dyn WorkflowRegistry>,
    /// Time source.
    clock: Arc<dyn Clock>,
    /// Per-item event receiver.
    observer: Arc<dyn SyncObserver>,
    /// Settings.
    config: RunSyncConfig,
}

impl RunReconciler {
    /// Creates a reconciler over the given ports.
    #[must_use]
    pub fn new(
        clusters: Arc<dyn ClusterRegistry>,
        connector: Arc<dyn OrchestratorConnector>,
        runs: Arc<dyn RunStore>,
        registry: Arc<dyn WorkflowRegistry>,
        clock: Arc<dyn Clock>,
        observer: Arc<dyn SyncObserver>,
        config: RunSyncConfig,
    ) -> Self {
        Self {
            clusters,
            connector,
            runs,
            registry,
            clock,
            observer,
            config,
        }
    }

    /// Returns the reconciler settings.
    #[must_use]
    pub const fn config(&self) -> &RunSyncConfig {
        &self.config
    }

    /// Reconciles the active cluster of one team.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] when the team has no active cluster or the
    /// registry cannot be read. Cluster-side failures are reported in the
    /// returned outcome instead.
    pub fn sync_cluster(&self, team: &TeamId) -> Result<ClusterSyncOutcome, RegistryError> {
        let cluster = self.clusters.resolve_for_team(team)?;
        Ok(self.reconcile(&cluster))
    }

    /// Reconciles every active cluster. Never fails.
    #[must_use]
    pub fn sync_all_clusters(&self) -> AggregateSyncOutcome {
        let mut clusters = match self.clusters.list_active() {
            Ok(clusters) => clusters,
            Err(err) => {
                return AggregateSyncOutcome {
                    clusters: Vec::new(),
                    error: Some(err.to_string()),
                    completed_at: self.clock.now(),
                };
            }
        };
        clusters.sort_by(|left, right| left.team.cmp(&right.team));
        let outcomes = self.reconcile_parallel(&clusters);
        AggregateSyncOutcome {
            clusters: outcomes,
            error: None,
            completed_at: self.clock.now(),
        }
    }

    /// Runs cluster passes on a bounded set of scoped workers, preserving order.
    fn reconcile_parallel(&self, clusters: &[ClusterConfig]) -> Vec<ClusterSyncOutcome> {
        let workers = self.config.max_parallel_clusters.max(1).min(clusters.len());
        if workers <= 1 {
            return clusters.iter().map(|cluster| self.reconcile(cluster)).collect();
        }
        let next = AtomicUsize::new(0);
        let mut slots: Vec<Option<ClusterSyncOutcome>> = vec![None; clusters.len()];
        thread::scope(|scope| {
            let handles: Vec<_> = (0 .. workers)
                .map(|_| {
                    scope.spawn(|| {
                        let mut done = Vec::new();
                        loop {
                            let index = next.fetch_add(1, Ordering::Relaxed);
                            let Some(cluster) = clusters.get(index) else {
                                break;
                            };
                            done.push((index, self.reconcile(cluster)));
                        }
                        done
                    })
                })
                .collect();
            for handle in handles {
                let Ok(done) = handle.join() else {
                    continue;
                };
                for (index, outcome) in done {
                    if let Some(slot) = slots.get_mut(index) {
                        *slot = Some(outcome);
                    }
                }
            }
        });
        clusters
            .iter()
            .zip(slots)
            .map(|(cluster, slot)| {
                slot.unwrap_or_else(|| self.failed_outcome(&cluster.team, "cluster worker panicked"))
            })
            .collect()
    }

    /// Builds an outcome for a cluster that could not be reconciled.
    fn failed_outcome(&self, team: &TeamId, message: &str) -> ClusterSyncOutcome {
        let mut outcome = ClusterSyncOutcome::start(team.clone(), self.clock.now());
        outcome.error = Some(message.to_string());
        outcome
    }

    /// Reconciles one cluster, capturing any failure in the outcome.
    fn reconcile(&self, cluster: &ClusterConfig) -> ClusterSyncOutcome {
        let now = self.clock.now();
        let mut outcome = ClusterSyncOutcome::start(cluster.team.clone(), now);
        if let Err(err) = self.reconcile_into(cluster, now, &mut outcome) {
            outcome.error = Some(err.to_string());
        }
        outcome.completed_at = self.clock.now();
        outcome
    }

    /// Performs the per-cluster algorithm.
    fn reconcile_into(
        &self,
        cluster: &ClusterConfig,
        now: Timestamp,
        outcome: &mut ClusterSyncOutcome,
    ) -> Result<(), ClusterPassError> {
        let team = &cluster.team;
        let cutoff = now.saturating_sub(self.config.lookback);
        let local = self.runs.list_open_for_team(team, cutoff)?;
        let client = self.connector.connect(cluster)?;
        let fetched = client.list_recent_runs(cutoff, self.config.page_size)?;
        outcome.fetched = u64::try_from(fetched.len()).unwrap_or(u64::MAX);

        let by_external: BTreeMap<&ExternalRunId, &ExecutionRun> = local
            .iter()
            .filter_map(|run| run.external_id.as_ref().map(|external_id| (external_id, run)))
            .collect();
        let mut seen: BTreeSet<ExternalRunId> = BTreeSet::new();
        for external in &fetched {
            if !seen.insert(external.external_id.clone()) {
                continue;
            }
            let existing = match by_external.get(&external.external_id) {
                Some(run) => Some((*run).clone()),
                None => self.runs.find_by_external_id(&external.external_id)?,
            };
            match existing {
                Some(run) if &run.team == team => {
                    if self.apply_observation(run, external, now)? {
                        outcome.updated += 1;
                    } else {
                        outcome.unchanged += 1;
                    }
                }
                Some(run) => {
                    outcome.skipped += 1;
                    self.skip(team, external, &format!("external id owned by team {}", run.team));
                }
                None => self.adopt_or_skip(team, external, now, outcome)?,
            }
        }

        let stale_before = now.saturating_sub(self.config.staleness);
        let horizon = self.truncation_horizon(&fetched, now);
        for run in &local {
            if run.external_id.as_ref().is_some_and(|external_id| seen.contains(external_id)) {
                continue;
            }
            let reference = run.reference_time();
            if reference >= stale_before || horizon.is_some_and(|oldest| reference < oldest) {
                continue;
            }
            let mut stale = run.clone();
            stale.status = RunStatus::Unknown;
            stale.last_synced_at = Some(now);
            self.runs.update(&stale)?;
            outcome.stale += 1;
            self.observer.on_event(&SyncEvent::RunMarkedStale {
                team: team.clone(),
                run_id: run.run_id.clone(),
                workflow: run.workflow.clone(),
                previous_status: run.status.as_str().to_string(),
            });
        }
        Ok(())
    }

    /// Oldest start time covered by a full (possibly truncated) page.
    ///
    /// Runs older than the horizon may simply have been cut off, so they are
    /// not eligible for staleness marking in this pass.
    fn truncation_horizon(&self, fetched: &[ExternalRun], now: Timestamp) -> Option<Timestamp> {
        if fetched.len() < self.config.page_size {
            return None;
        }
        Some(fetched.iter().filter_map(|run| run.started_at).min().unwrap_or(now))
    }

    /// Applies an observation to a matched run. Returns true when it changed.
    fn apply_observation(
        &self,
        current: ExecutionRun,
        external: &ExternalRun,
        now: Timestamp,
    ) -> Result<bool, StoreError> {
        let mut next = current.clone();
        if !current.status.is_terminal() {
            next.status = next_status(current.status, &external.state);
            next.started_at = external.started_at.or(current.started_at);
            next.ended_at = external.ended_at.or(current.ended_at);
            next.progress = external.note.clone().or_else(|| current.progress.clone());
        }
        let changed = next.status != current.status
            || next.started_at != current.started_at
            || next.ended_at != current.ended_at
            || next.progress != current.progress;
        next.last_synced_at = Some(now);
        self.runs.update(&next)?;
        Ok(changed)
    }

    /// Applies the adoption policy to an external run with no local record.
    fn adopt_or_skip(
        &self,
        team: &TeamId,
        external: &ExternalRun,
        now: Timestamp,
        outcome: &mut ClusterSyncOutcome,
    ) -> Result<(), StoreError> {
        if !self.config.adopt_external_runs {
            outcome.skipped += 1;
            self.skip(team, external, "adoption disabled");
            return Ok(());
        }
        let workflow = WorkflowName::new(external.workflow_id.clone());
        let live = self.registry.get(&workflow)?.is_some_and(|definition| definition.is_live());
        if !live {
            outcome.skipped += 1;
            self.skip(team, external, "no live workflow definition");
            return Ok(());
        }
        let created_at = external.started_at.unwrap_or(now);
        let run = ExecutionRun {
            run_id: RunId::generate(now.as_unix_millis()),
            external_id: Some(external.external_id.clone()),
            workflow,
            team: team.clone(),
            status: external.state.to_local(),
            created_at,
            started_at: external.started_at,
            ended_at: external.ended_at,
            last_synced_at: Some(now),
            progress: external.note.clone(),
        };
        self.runs.insert(&run)?;
        outcome.adopted += 1;
        Ok(())
    }

    /// Emits a skip event.
    fn skip(&self, team: &TeamId, external: &ExternalRun, reason: &str) {
        self.observer.on_event(&SyncEvent::ExternalRunSkipped {
            team: team.clone(),
            external_id: external.external_id.clone(),
            workflow_id: external.workflow_id.clone(),
            reason: reason.to_string(),
        });
    }
}
