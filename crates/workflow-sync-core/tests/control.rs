// crates/workflow-sync-core/tests/control.rs
// ============================================================================
// Module: Workflow Control Tests
// Description: Trigger, stop, pause, and registration behavior.
// ============================================================================
//! ## Overview
//! Exercises [`WorkflowControl`] against the in-memory ports.

#![allow(clippy::unwrap_used, reason = "Tests use unwrap on deterministic fixtures.")]

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::Call;
use common::ClusterScript;
use common::FakeConnector;
use common::RecordingObserver;
use common::at_minutes;
use common::cluster;
use common::external;
use workflow_sync_core::ControlError;
use workflow_sync_core::DefinitionOrigin;
use workflow_sync_core::DefinitionStatus;
use workflow_sync_core::ExternalRunId;
use workflow_sync_core::InMemoryRunStore;
use workflow_sync_core::InMemoryWorkflowRegistry;
use workflow_sync_core::ManualClock;
use workflow_sync_core::OrchestratorError;
use workflow_sync_core::RegisterRequest;
use workflow_sync_core::RunReconciler;
use workflow_sync_core::RunStatus;
use workflow_sync_core::RunStore;
use workflow_sync_core::RunSyncConfig;
use workflow_sync_core::Schedule;
use workflow_sync_core::StaticClusterRegistry;
use workflow_sync_core::TeamId;
use workflow_sync_core::WorkflowControl;
use workflow_sync_core::WorkflowDefinition;
use workflow_sync_core::WorkflowName;
use workflow_sync_core::WorkflowRegistry;

/// Control surface plus handles to its fakes.
struct Harness {
    /// Orchestrator fake.
    connector: FakeConnector,
    /// Run store.
    runs: Arc<InMemoryRunStore>,
    /// Registry.
    registry: Arc<InMemoryWorkflowRegistry>,
    /// Shared time source.
    clock: Arc<ManualClock>,
    /// Control under test.
    control: WorkflowControl,
}

fn harness() -> Harness {
    let connector = FakeConnector::default();
    let runs = Arc::new(InMemoryRunStore::new());
    let registry = Arc::new(InMemoryWorkflowRegistry::new());
    let clock = Arc::new(ManualClock::new(at_minutes(0)));
    let control = WorkflowControl::new(
        registry.clone(),
        runs.clone(),
        Arc::new(StaticClusterRegistry::new(vec![cluster("team_a")])),
        Arc::new(connector.clone()),
        clock.clone(),
    );
    Harness {
        connector,
        runs,
        registry,
        clock,
        control,
    }
}

fn request(name: &str, team: &str) -> RegisterRequest {
    RegisterRequest {
        name: WorkflowName::new(name),
        team: TeamId::new(team),
        description: Some("manual".to_string()),
        schedule: Schedule {
            cron: "0 6 * * *".to_string(),
            timezone: "UTC".to_string(),
        },
    }
}

#[test]
fn trigger_records_pending_run_with_external_id() {
    let h = harness();
    h.control.register(request("wf", "team_a")).unwrap();

    let run = h.control.trigger_run(&WorkflowName::new("wf")).unwrap();
    assert_eq!(run.status, RunStatus::Pending);
    assert_eq!(run.external_id, Some(ExternalRunId::new(run.run_id.as_str())));
    assert_eq!(run.created_at, at_minutes(0));
    assert_eq!(h.runs.get(&run.run_id).unwrap().unwrap(), run);
    assert_eq!(h.connector.calls(), vec![Call::Trigger("wf".to_string(), run.run_id.to_string())]);
}

#[test]
fn failed_submission_leaves_a_failed_run() {
    let h = harness();
    h.control.register(request("wf", "team_a")).unwrap();
    h.connector.script(
        "team_a",
        ClusterScript {
            runs: Vec::new(),
            failure: Some(OrchestratorError::Auth(401)),
        },
    );

    let err = h.control.trigger_run(&WorkflowName::new("wf")).unwrap_err();
    assert!(matches!(err, ControlError::Orchestrator(OrchestratorError::Auth(401))));
    let all = h.runs.all().unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].status, RunStatus::Failed);
    assert!(all[0].progress.as_deref().unwrap().contains("401"));
}

/// Reconciler sharing the harness stores, with a 2h staleness window.
fn reconciler(h: &Harness) -> RunReconciler {
    RunReconciler::new(
        Arc::new(StaticClusterRegistry::new(vec![cluster("team_a")])),
        Arc::new(h.connector.clone()),
        h.runs.clone(),
        h.registry.clone(),
        h.clock.clone(),
        Arc::new(RecordingObserver::default()),
        RunSyncConfig {
            lookback: Duration::from_secs(24 * 3600),
            staleness: Duration::from_secs(2 * 3600),
            page_size: 10,
            adopt_external_runs: false,
            max_parallel_clusters: 1,
        },
    )
}

#[test]
fn timed_out_submission_stays_pending_and_converges() {
    let h = harness();
    h.control.register(request("wf", "team_a")).unwrap();
    h.connector.script(
        "team_a",
        ClusterScript {
            runs: Vec::new(),
            failure: Some(OrchestratorError::Timeout("deadline exceeded".to_string())),
        },
    );

    let err = h.control.trigger_run(&WorkflowName::new("wf")).unwrap_err();
    assert!(matches!(err, ControlError::Orchestrator(OrchestratorError::Timeout(_))));
    let pending = h.runs.all().unwrap().remove(0);
    assert_eq!(pending.status, RunStatus::Pending);
    assert_eq!(pending.external_id, Some(ExternalRunId::new(pending.run_id.as_str())));
    assert_eq!(pending.ended_at, None);

    h.connector.script(
        "team_a",
        ClusterScript {
            runs: vec![external(pending.run_id.as_str(), "wf", "running", Some(at_minutes(0)))],
            failure: None,
        },
    );
    h.clock.set(at_minutes(5));
    let outcome = reconciler(&h).sync_cluster(&TeamId::new("team_a")).unwrap();
    assert_eq!(outcome.updated, 1);
    assert_eq!(outcome.skipped, 0);
    let settled = h.runs.get(&pending.run_id).unwrap().unwrap();
    assert_eq!(settled.status, RunStatus::Running);
    assert_eq!(settled.started_at, Some(at_minutes(0)));
}

#[test]
fn unconfirmed_submission_never_seen_ages_into_unknown() {
    let h = harness();
    h.control.register(request("wf", "team_a")).unwrap();
    h.connector.script(
        "team_a",
        ClusterScript {
            runs: Vec::new(),
            failure: Some(OrchestratorError::Status {
                status: 503,
                message: "unavailable".to_string(),
            }),
        },
    );
    h.control.trigger_run(&WorkflowName::new("wf")).unwrap_err();
    let pending = h.runs.all().unwrap().remove(0);
    assert_eq!(pending.status, RunStatus::Pending);

    h.connector.script("team_a", ClusterScript::default());
    h.clock.set(at_minutes(30));
    let early = reconciler(&h).sync_cluster(&TeamId::new("team_a")).unwrap();
    assert_eq!(early.stale, 0);
    assert_eq!(h.runs.get(&pending.run_id).unwrap().unwrap().status, RunStatus::Pending);

    h.clock.set(at_minutes(180));
    let late = reconciler(&h).sync_cluster(&TeamId::new("team_a")).unwrap();
    assert_eq!(late.stale, 1);
    assert_eq!(h.runs.get(&pending.run_id).unwrap().unwrap().status, RunStatus::Unknown);
}

#[test]
fn trigger_without_cluster_is_a_configuration_error() {
    let h = harness();
    h.control.register(request("orphan", "team_z")).unwrap();
    let err = h.control.trigger_run(&WorkflowName::new("orphan")).unwrap_err();
    assert!(matches!(err, ControlError::Cluster(_)));
    assert!(h.runs.all().unwrap().is_empty());
}

#[test]
fn stop_moves_submitted_runs_to_stopping() {
    let h = harness();
    h.control.register(request("wf", "team_a")).unwrap();
    let run = h.control.trigger_run(&WorkflowName::new("wf")).unwrap();

    let stopped = h.control.stop_run(&run.run_id).unwrap();
    assert_eq!(stopped.status, RunStatus::Stopping);
    assert!(h.connector.calls().contains(&Call::Stop("wf".to_string(), run.run_id.to_string())));

    let err = h.control.stop_run(&run.run_id).unwrap_err();
    assert!(matches!(err, ControlError::Conflict(_)));
}

#[test]
fn pause_and_unpause_update_registry_and_cluster() {
    let h = harness();
    h.control.register(request("wf", "team_a")).unwrap();

    let paused = h.control.pause(&WorkflowName::new("wf")).unwrap();
    assert_eq!(paused.status, DefinitionStatus::Paused);
    let err = h.control.trigger_run(&WorkflowName::new("wf")).unwrap_err();
    assert!(matches!(err, ControlError::Conflict(_)));

    let resumed = h.control.unpause(&WorkflowName::new("wf")).unwrap();
    assert_eq!(resumed.status, DefinitionStatus::Active);
    assert_eq!(
        h.connector.calls(),
        vec![Call::Pause("wf".to_string(), true), Call::Pause("wf".to_string(), false)]
    );
}

#[test]
fn manual_registration_cannot_replace_live_code_definition() {
    let h = harness();
    h.registry
        .upsert(&WorkflowDefinition {
            name: WorkflowName::new("coded"),
            team: TeamId::new("team_a"),
            description: None,
            schedule: Schedule {
                cron: "0 6 * * *".to_string(),
                timezone: "UTC".to_string(),
            },
            origin: DefinitionOrigin::Code,
            spec_path: Some("coded.yaml".to_string()),
            spec_digest: None,
            status: DefinitionStatus::Active,
            created_at: at_minutes(-10),
            updated_at: at_minutes(-10),
            deleted_at: None,
        })
        .unwrap();

    let err = h.control.register(request("coded", "team_a")).unwrap_err();
    assert!(matches!(err, ControlError::Conflict(_)));

    h.control.unregister(&WorkflowName::new("coded")).unwrap();
    let replaced = h.control.register(request("coded", "team_a")).unwrap();
    assert_eq!(replaced.origin, DefinitionOrigin::Manual);
    assert_eq!(replaced.created_at, at_minutes(0));
}

#[test]
fn registration_validates_input() {
    let h = harness();
    let mut bad = request("wf", "team_a");
    bad.schedule.timezone = "Not/AZone".to_string();
    assert!(matches!(h.control.register(bad).unwrap_err(), ControlError::Invalid(_)));
    assert!(matches!(
        h.control.register(request("bad name", "team_a")).unwrap_err(),
        ControlError::Invalid(_)
    ));
}

#[test]
fn unregister_soft_deletes() {
    let h = harness();
    h.control.register(request("wf", "team_a")).unwrap();
    let removed = h.control.unregister(&WorkflowName::new("wf")).unwrap();
    assert_eq!(removed.status, DefinitionStatus::Disabled);
    assert_eq!(removed.deleted_at, Some(at_minutes(0)));
    assert!(h.registry.get(&WorkflowName::new("wf")).unwrap().is_some());
    assert!(matches!(
        h.control.unregister(&WorkflowName::new("wf")).unwrap_err(),
        ControlError::NotFound(_)
    ));
}
