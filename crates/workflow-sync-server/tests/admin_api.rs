// crates/workflow-sync-server/tests/admin_api.rs
// ============================================================================
// Module: Admin API Tests
// Description: HTTP status mapping and payloads of the admin router.
// ============================================================================
//! ## Overview
//! Serves [`admin_router`] on a loopback listener and drives it with reqwest.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    reason = "Test-only assertions and helpers are permitted."
)]

mod common;

use std::net::SocketAddr;
use std::sync::Arc;

use serde_json::Value;
use serde_json::json;
use tokio::net::TcpListener;
use workflow_sync_server::SyncTrigger;
use workflow_sync_server::admin_router;

use crate::common::Harness;
use crate::common::HarnessOptions;
use crate::common::harness;
use crate::common::spec;

/// Serves the harness router and returns its base URL.
async fn serve(h: &Harness) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    let router = admin_router(Arc::clone(&h.service));
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    format!("http://{addr}")
}

/// Sends `method path` with an optional JSON body; returns status and body.
async fn call(base: &str, method: reqwest::Method, path: &str, body: Option<Value>) -> (u16, Value) {
    let client = reqwest::Client::new();
    let mut request = client.request(method, format!("{base}{path}"));
    if let Some(body) = body {
        request = request
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body.to_string());
    }
    let response = request.send().await.unwrap();
    let status = response.status().as_u16();
    let text = response.text().await.unwrap();
    let value = if text.is_empty() { Value::Null } else { serde_json::from_str(&text).unwrap() };
    (status, value)
}

#[tokio::test(flavor = "multi_thread")]
async fn health_reports_guard_state() {
    let h = harness(HarnessOptions::default());
    let base = serve(&h).await;
    let (status, body) = call(&base, reqwest::Method::GET, "/v1/health", None).await;
    assert_eq!(status, 200);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["spec_sync"]["enabled"], true);
    assert_eq!(body["run_sync"]["running"], false);
}

#[tokio::test(flavor = "multi_thread")]
async fn sync_and_trigger_flow() {
    let h = harness(HarnessOptions::default());
    h.blobs.put("metrics/dau.yaml", &spec("team_a.dau", "0 6 * * *"));
    let base = serve(&h).await;

    let (status, body) = call(&base, reqwest::Method::POST, "/v1/sync/specs", None).await;
    assert_eq!(status, 200);
    assert_eq!(body["created"], 1);

    let (status, body) =
        call(&base, reqwest::Method::POST, "/v1/workflows/team_a.dau/runs", None).await;
    assert_eq!(status, 201, "{body}");
    assert_eq!(body["status"], "PENDING");
    let run_id = body["run_id"].as_str().unwrap().to_string();

    let (status, body) =
        call(&base, reqwest::Method::POST, &format!("/v1/runs/{run_id}/stop"), None).await;
    assert_eq!(status, 200, "{body}");
    assert_eq!(body["status"], "STOPPING");

    let (status, body) = call(&base, reqwest::Method::POST, "/v1/sync/runs", None).await;
    assert_eq!(status, 200);
    assert_eq!(body["clusters"].as_array().unwrap().len(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn missing_resources_return_not_found() {
    let h = harness(HarnessOptions::default());
    let base = serve(&h).await;

    let (status, body) =
        call(&base, reqwest::Method::POST, "/v1/workflows/team_a.none/runs", None).await;
    assert_eq!(status, 404);
    assert!(body["error"].as_str().unwrap().contains("team_a.none"));

    let (status, _) = call(&base, reqwest::Method::POST, "/v1/sync/runs/team_z", None).await;
    assert_eq!(status, 404);

    let (status, _) = call(&base, reqwest::Method::POST, "/v1/runs/run-unknown/stop", None).await;
    assert_eq!(status, 404);
}

#[tokio::test(flavor = "multi_thread")]
async fn register_conflicts_with_spec_owned_workflow() {
    let h = harness(HarnessOptions::default());
    h.blobs.put("metrics/dau.yaml", &spec("team_a.dau", "0 6 * * *"));
    h.service.trigger_spec_sync(SyncTrigger::Manual).unwrap();
    let base = serve(&h).await;

    let request = |name: &str| {
        json!({
            "name": name,
            "team": "team_a",
            "schedule": { "cron": "0 7 * * *", "timezone": "UTC" },
        })
    };
    let (status, _) =
        call(&base, reqwest::Method::POST, "/v1/workflows", Some(request("team_a.dau"))).await;
    assert_eq!(status, 409);

    let (status, body) =
        call(&base, reqwest::Method::POST, "/v1/workflows", Some(request("team_a.adhoc"))).await;
    assert_eq!(status, 201, "{body}");
    assert_eq!(body["origin"], "MANUAL");

    let (status, _) =
        call(&base, reqwest::Method::DELETE, "/v1/workflows/team_a.adhoc", None).await;
    assert_eq!(status, 200);
}

#[tokio::test(flavor = "multi_thread")]
async fn disabled_sync_returns_unavailable() {
    let h = harness(HarnessOptions {
        spec_sync: false,
        run_sync: true,
    });
    let base = serve(&h).await;
    let (status, body) = call(&base, reqwest::Method::POST, "/v1/sync/specs", None).await;
    assert_eq!(status, 503);
    assert!(body["error"].is_string());
}

#[tokio::test(flavor = "multi_thread")]
async fn concurrent_spec_sync_returns_conflict() {
    let h = harness(HarnessOptions::default());
    let (entered, release) = h.blobs.hold();
    let service = Arc::clone(&h.service);
    let first =
        tokio::task::spawn_blocking(move || service.trigger_spec_sync(SyncTrigger::Timer));
    tokio::task::spawn_blocking(move || entered.recv()).await.unwrap().unwrap();

    let base = serve(&h).await;
    let (status, _) = call(&base, reqwest::Method::POST, "/v1/sync/specs", None).await;
    assert_eq!(status, 409);

    release.send(()).unwrap();
    assert!(first.await.unwrap().is_ok());
}
