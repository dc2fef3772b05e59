// crates/workflow-sync-providers/tests/http_orchestrator.rs
// ============================================================================
// Module: HTTP Orchestrator Client Tests
// Description: Wire format, auth, retry, and limit behavior against a local server.
// ============================================================================
//! ## Overview
//! Runs [`HttpOrchestratorClient`] against a scripted `tiny_http` server that
//! records every request it receives.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    reason = "Test-only assertions and helpers are permitted."
)]

use std::thread;
use std::thread::JoinHandle;
use std::time::Duration;

use serde_json::Value;
use tiny_http::Header;
use tiny_http::Response;
use tiny_http::Server;
use workflow_sync_core::ClusterConfig;
use workflow_sync_core::ClusterCredential;
use workflow_sync_core::ExternalRunId;
use workflow_sync_core::ExternalRunState;
use workflow_sync_core::OrchestratorClient;
use workflow_sync_core::OrchestratorConnector;
use workflow_sync_core::OrchestratorError;
use workflow_sync_core::RetryPolicy;
use workflow_sync_core::RunId;
use workflow_sync_core::TeamId;
use workflow_sync_core::Timestamp;
use workflow_sync_core::WorkflowName;
use workflow_sync_providers::HttpOrchestratorClient;
use workflow_sync_providers::HttpOrchestratorConfig;
use workflow_sync_providers::HttpOrchestratorConnector;

// ============================================================================
// SECTION: Mock Cluster
// ============================================================================

/// One request as seen by the mock cluster.
#[derive(Debug)]
struct Recorded {
    /// HTTP method.
    method: String,
    /// Request path and query.
    url: String,
    /// Authorization header value.
    authorization: Option<String>,
    /// Decoded JSON body, if any.
    body: Option<Value>,
}

/// Serves `script` in order, one response per request, then shuts down.
fn serve(script: Vec<(u16, String)>) -> (String, JoinHandle<Vec<Recorded>>) {
    let server = Server::http("127.0.0.1:0").unwrap();
    let addr = server.server_addr().to_ip().unwrap();
    let handle = thread::spawn(move || {
        let mut recorded = Vec::new();
        for (status, body) in script {
            let Ok(mut request) = server.recv() else {
                break;
            };
            let mut raw = String::new();
            request.as_reader().read_to_string(&mut raw).unwrap();
            let authorization = request
                .headers()
                .iter()
                .find(|header| header.field.equiv("Authorization"))
                .map(|header| header.value.as_str().to_string());
            recorded.push(Recorded {
                method: request.method().to_string(),
                url: request.url().to_string(),
                authorization,
                body: serde_json::from_str(&raw).ok(),
            });
            let content_type =
                Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..]).unwrap();
            let response =
                Response::from_string(body).with_status_code(status).with_header(content_type);
            let _ = request.respond(response);
        }
        recorded
    });
    (format!("http://{addr}"), handle)
}

/// Test client settings: plain HTTP and near-zero backoff.
fn config() -> HttpOrchestratorConfig {
    HttpOrchestratorConfig {
        allow_http: true,
        request_timeout_ms: 2_000,
        retry: RetryPolicy {
            max_attempts: 3,
            initial_backoff_ms: 1,
            max_backoff_ms: 5,
            multiplier: 2,
        },
        ..HttpOrchestratorConfig::default()
    }
}

/// Cluster pointing at `endpoint` with a bearer token.
fn cluster(endpoint: &str) -> ClusterConfig {
    ClusterConfig {
        team: TeamId::new("team_a"),
        endpoint: endpoint.to_string(),
        credential: ClusterCredential::Bearer {
            token: "secret-token".to_string(),
        },
        active: true,
    }
}

/// Connects a client for `endpoint` with `config`.
fn client(endpoint: &str, config: HttpOrchestratorConfig) -> HttpOrchestratorClient {
    HttpOrchestratorClient::new(&cluster(endpoint), config).unwrap()
}

/// Run payload as the orchestrator encodes it.
fn dag_run(id: &str, state: &str) -> String {
    format!(
        r#"{{"dag_run_id":"{id}","dag_id":"team_a.dau","state":"{state}","start_date":"2024-06-01T06:00:00+00:00","end_date":null,"note":null}}"#
    )
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn list_recent_runs_posts_filter_and_decodes_page() {
    let page = format!(
        r#"{{"dag_runs":[{},{}],"total_entries":2}}"#,
        dag_run("ext-1", "success"),
        dag_run("ext-2", "zombie")
    );
    let (endpoint, handle) = serve(vec![(200, page)]);
    let since = Timestamp::parse_rfc3339("2024-05-31T06:00:00Z").unwrap();
    let runs = client(&endpoint, config()).list_recent_runs(since, 50).unwrap();
    let recorded = handle.join().unwrap();

    assert_eq!(runs.len(), 2);
    assert_eq!(runs[0].external_id, ExternalRunId::new("ext-1"));
    assert_eq!(runs[0].workflow_id, "team_a.dau");
    assert_eq!(runs[0].state, ExternalRunState::Success);
    assert_eq!(runs[0].started_at, Some(Timestamp::parse_rfc3339("2024-06-01T06:00:00Z").unwrap()));
    assert_eq!(runs[0].ended_at, None);
    assert_eq!(runs[1].state, ExternalRunState::Unrecognized("zombie".to_string()));

    assert_eq!(recorded.len(), 1);
    assert_eq!(recorded[0].method, "POST");
    assert_eq!(recorded[0].url, "/api/v1/dags/~/dagRuns/list");
    assert_eq!(recorded[0].authorization.as_deref(), Some("Bearer secret-token"));
    let body = recorded[0].body.as_ref().unwrap();
    assert_eq!(body["page_limit"], 50);
    assert_eq!(body["order_by"], "-start_date");
    assert!(body["start_date_gte"].as_str().unwrap().starts_with("2024-05-31T06:00:00"));
}

#[test]
fn malformed_entries_do_not_sink_the_page() {
    let page = format!(
        r#"{{"dag_runs":[{},{},{},{},{}]}}"#,
        dag_run("ext-1", "running"),
        r#"{"dag_run_id":"ext-2","dag_id":"team_a.dau","state":"success","start_date":"yesterday"}"#,
        r#"{"dag_run_id":"ext-3","dag_id":"team_a.dau","state":null,"start_date":null}"#,
        r#"{"dag_id":"team_a.dau","state":"failed"}"#,
        r#"{"dag_run_id":"","dag_id":"team_a.dau","state":"failed"}"#
    );
    let (endpoint, handle) = serve(vec![(200, page)]);
    let runs = client(&endpoint, config()).list_recent_runs(Timestamp::from_unix_millis(0), 10).unwrap();
    handle.join().unwrap();

    let ids: Vec<&str> = runs.iter().map(|run| run.external_id.as_str()).collect();
    assert_eq!(ids, vec!["ext-1", "ext-2", "ext-3"]);
    assert_eq!(runs[1].state, ExternalRunState::Success);
    assert_eq!(runs[1].started_at, None);
    assert_eq!(runs[2].state, ExternalRunState::Queued);
}

#[test]
fn server_errors_are_retried() {
    let page = r#"{"dag_runs":[]}"#.to_string();
    let (endpoint, handle) = serve(vec![(503, "busy".to_string()), (200, page)]);
    let runs = client(&endpoint, config())
        .list_recent_runs(Timestamp::from_unix_millis(0), 10)
        .unwrap();
    assert!(runs.is_empty());
    assert_eq!(handle.join().unwrap().len(), 2);
}

#[test]
fn retries_stop_at_max_attempts() {
    let script = vec![(500, "a".to_string()), (500, "b".to_string()), (500, "c".to_string())];
    let (endpoint, handle) = serve(script);
    let result = client(&endpoint, config()).list_recent_runs(Timestamp::from_unix_millis(0), 10);
    assert!(matches!(result, Err(OrchestratorError::Status { status: 500, .. })), "{result:?}");
    assert_eq!(handle.join().unwrap().len(), 3);
}

#[test]
fn auth_failures_are_not_retried() {
    let (endpoint, handle) = serve(vec![(401, "denied".to_string())]);
    let result = client(&endpoint, config()).list_recent_runs(Timestamp::from_unix_millis(0), 10);
    assert_eq!(result.unwrap_err(), OrchestratorError::Auth(401));
    assert_eq!(handle.join().unwrap().len(), 1);
}

#[test]
fn client_errors_are_not_retried() {
    let (endpoint, handle) = serve(vec![(404, "no such dag".to_string())]);
    let result =
        client(&endpoint, config()).set_paused(&WorkflowName::new("team_a.dau"), true);
    assert_eq!(
        result.unwrap_err(),
        OrchestratorError::Status {
            status: 404,
            message: "no such dag".to_string(),
        }
    );
    assert_eq!(handle.join().unwrap().len(), 1);
}

#[test]
fn trigger_submits_local_run_id() {
    let (endpoint, handle) = serve(vec![(200, dag_run("run-123", "queued"))]);
    let run = client(&endpoint, config())
        .trigger_run(&WorkflowName::new("team_a.dau"), &RunId::new("run-123"))
        .unwrap();
    let recorded = handle.join().unwrap();
    assert_eq!(run.external_id, ExternalRunId::new("run-123"));
    assert_eq!(run.state, ExternalRunState::Queued);
    assert_eq!(recorded[0].method, "POST");
    assert_eq!(recorded[0].url, "/api/v1/dags/team_a.dau/dagRuns");
    assert_eq!(recorded[0].body.as_ref().unwrap()["dag_run_id"], "run-123");
}

#[test]
fn trigger_conflict_resolves_existing_run() {
    let script = vec![(409, "exists".to_string()), (200, dag_run("run-9", "running"))];
    let (endpoint, handle) = serve(script);
    let run = client(&endpoint, config())
        .trigger_run(&WorkflowName::new("team_a.dau"), &RunId::new("run-9"))
        .unwrap();
    let recorded = handle.join().unwrap();
    assert_eq!(run.state, ExternalRunState::Running);
    assert_eq!(recorded[1].method, "GET");
    assert_eq!(recorded[1].url, "/api/v1/dags/team_a.dau/dagRuns/run-9");
}

#[test]
fn stop_marks_run_failed_with_escaped_id() {
    let (endpoint, handle) = serve(vec![(200, dag_run("x", "failed"))]);
    client(&endpoint, config())
        .stop_run(&WorkflowName::new("team_a.dau"), &ExternalRunId::new("scheduled__a/b"))
        .unwrap();
    let recorded = handle.join().unwrap();
    assert_eq!(recorded[0].method, "PATCH");
    assert_eq!(recorded[0].url, "/api/v1/dags/team_a.dau/dagRuns/scheduled__a%2Fb");
    assert_eq!(recorded[0].body.as_ref().unwrap()["state"], "failed");
}

#[test]
fn pause_uses_basic_auth_and_endpoint_path_prefix() {
    let (endpoint, handle) = serve(vec![(200, r#"{"is_paused":true}"#.to_string())]);
    let cluster = ClusterConfig {
        credential: ClusterCredential::Basic {
            username: "svc".to_string(),
            password: "pw".to_string(),
        },
        endpoint: format!("{endpoint}/airflow/"),
        ..cluster(&endpoint)
    };
    HttpOrchestratorClient::new(&cluster, config())
        .unwrap()
        .set_paused(&WorkflowName::new("team_a.dau"), true)
        .unwrap();
    let recorded = handle.join().unwrap();
    assert_eq!(recorded[0].url, "/airflow/api/v1/dags/team_a.dau");
    assert_eq!(recorded[0].authorization.as_deref(), Some("Basic c3ZjOnB3"));
    assert_eq!(recorded[0].body.as_ref().unwrap()["is_paused"], true);
}

#[test]
fn oversized_response_is_rejected() {
    let page = format!(r#"{{"dag_runs":[{}]}}"#, dag_run("ext-1", "success"));
    let (endpoint, handle) = serve(vec![(200, page)]);
    let limited = HttpOrchestratorConfig {
        max_response_bytes: 16,
        ..config()
    };
    let result = client(&endpoint, limited).list_recent_runs(Timestamp::from_unix_millis(0), 10);
    assert!(matches!(result, Err(OrchestratorError::Malformed(_))), "{result:?}");
    handle.join().unwrap();
}

#[test]
fn malformed_body_is_reported() {
    let (endpoint, handle) = serve(vec![(200, "not json".to_string())]);
    let result = client(&endpoint, config()).list_recent_runs(Timestamp::from_unix_millis(0), 10);
    assert!(matches!(result, Err(OrchestratorError::Malformed(_))), "{result:?}");
    handle.join().unwrap();
}

#[test]
fn slow_cluster_times_out() {
    let server = Server::http("127.0.0.1:0").unwrap();
    let addr = server.server_addr().to_ip().unwrap();
    let handle = thread::spawn(move || {
        if let Ok(request) = server.recv() {
            thread::sleep(Duration::from_millis(600));
            drop(request);
        }
    });
    let slow = HttpOrchestratorConfig {
        request_timeout_ms: 150,
        retry: RetryPolicy::none(),
        ..config()
    };
    let result =
        client(&format!("http://{addr}"), slow).list_recent_runs(Timestamp::from_unix_millis(0), 10);
    assert!(matches!(result, Err(OrchestratorError::Timeout(_))), "{result:?}");
    handle.join().unwrap();
}

#[test]
fn connector_refuses_plain_http_without_opt_in() {
    let connector = HttpOrchestratorConnector::new(HttpOrchestratorConfig::default());
    let result = connector.connect(&cluster("http://airflow.internal"));
    assert!(matches!(result, Err(OrchestratorError::Invalid(_))));
    assert!(connector.connect(&cluster("https://airflow.internal")).is_ok());
}
