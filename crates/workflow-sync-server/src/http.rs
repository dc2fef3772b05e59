// crates/workflow-sync-server/src/http.rs
// ============================================================================
// Module: Admin HTTP API
// Description: Axum routes for on-demand sync and workflow control.
// Purpose: Expose the sync service to operators and platform tooling.
// Dependencies: axum, serde_json, tokio
// ============================================================================

//! ## Overview
//! Every handler moves the blocking service call onto tokio's blocking pool
//! and answers with JSON: the operation result on success, or
//! `{"error": message}` with a status derived from the failure.
//!
//! | Failure | Status |
//! |---|---|
//! | sync already running, state conflict | 409 |
//! | unknown workflow, run, or cluster | 404 |
//! | invalid request | 400 |
//! | sync kind disabled | 503 |
//! | orchestrator failure | 502 |
//! | store or registry failure | 500 |

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::Path;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::routing::delete;
use axum::routing::get;
use axum::routing::post;
use serde::Serialize;
use serde_json::json;
use workflow_sync_core::ControlError;
use workflow_sync_core::RegisterRequest;
use workflow_sync_core::RegistryError;
use workflow_sync_core::RunId;
use workflow_sync_core::TeamId;
use workflow_sync_core::WorkflowName;

use crate::guard::SyncKind;
use crate::guard::SyncTrigger;
use crate::service::ServiceError;
use crate::service::SyncService;

// ============================================================================
// SECTION: Router
// ============================================================================

/// Builds the admin API router over `service`.
#[must_use]
pub fn admin_router(service: Arc<SyncService>) -> Router {
    Router::new()
        .route("/v1/health", get(health))
        .route("/v1/sync/specs", post(sync_specs))
        .route("/v1/sync/runs", post(sync_runs))
        .route("/v1/sync/runs/{team}", post(sync_cluster))
        .route("/v1/workflows", post(register))
        .route("/v1/workflows/{name}", delete(unregister))
        .route("/v1/workflows/{name}/runs", post(trigger_run))
        .route("/v1/workflows/{name}/pause", post(pause))
        .route("/v1/workflows/{name}/unpause", post(unpause))
        .route("/v1/runs/{run_id}/stop", post(stop_run))
        .with_state(service)
}

// ============================================================================
// SECTION: Handlers
// ============================================================================

/// Reports liveness and guard state.
async fn health(State(service): State<Arc<SyncService>>) -> impl IntoResponse {
    let kind_status = |kind: SyncKind| {
        json!({ "enabled": service.is_enabled(kind), "running": service.is_running(kind) })
    };
    Json(json!({
        "status": "ok",
        "spec_sync": kind_status(SyncKind::Specs),
        "run_sync": kind_status(SyncKind::Runs),
    }))
}

/// `POST /v1/sync/specs`
async fn sync_specs(State(service): State<Arc<SyncService>>) -> Response {
    run_blocking(service, StatusCode::OK, |service| {
        service.trigger_spec_sync(SyncTrigger::Manual)
    })
    .await
}

/// `POST /v1/sync/runs`
async fn sync_runs(State(service): State<Arc<SyncService>>) -> Response {
    run_blocking(service, StatusCode::OK, |service| service.trigger_run_sync(SyncTrigger::Manual))
        .await
}

/// `POST /v1/sync/runs/{team}`
async fn sync_cluster(
    State(service): State<Arc<SyncService>>,
    Path(team): Path<TeamId>,
) -> Response {
    run_blocking(service, StatusCode::OK, move |service| {
        service.trigger_cluster_run_sync(&team, SyncTrigger::Manual)
    })
    .await
}

/// `POST /v1/workflows`
async fn register(
    State(service): State<Arc<SyncService>>,
    Json(request): Json<RegisterRequest>,
) -> Response {
    run_blocking(service, StatusCode::CREATED, move |service| service.register(request)).await
}

/// `DELETE /v1/workflows/{name}`
async fn unregister(
    State(service): State<Arc<SyncService>>,
    Path(name): Path<WorkflowName>,
) -> Response {
    run_blocking(service, StatusCode::OK, move |service| service.unregister(&name)).await
}

/// `POST /v1/workflows/{name}/runs`
async fn trigger_run(
    State(service): State<Arc<SyncService>>,
    Path(name): Path<WorkflowName>,
) -> Response {
    run_blocking(service, StatusCode::CREATED, move |service| service.trigger_run(&name)).await
}

/// `POST /v1/workflows/{name}/pause`
async fn pause(
    State(service): State<Arc<SyncService>>,
    Path(name): Path<WorkflowName>,
) -> Response {
    run_blocking(service, StatusCode::OK, move |service| service.pause(&name)).await
}

/// `POST /v1/workflows/{name}/unpause`
async fn unpause(
    State(service): State<Arc<SyncService>>,
    Path(name): Path<WorkflowName>,
) -> Response {
    run_blocking(service, StatusCode::OK, move |service| service.unpause(&name)).await
}

/// `POST /v1/runs/{run_id}/stop`
async fn stop_run(
    State(service): State<Arc<SyncService>>,
    Path(run_id): Path<RunId>,
) -> Response {
    run_blocking(service, StatusCode::OK, move |service| service.stop_run(&run_id)).await
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Runs `operation` on the blocking pool and renders its result.
async fn run_blocking<T, F>(service: Arc<SyncService>, success: StatusCode, operation: F) -> Response
where
    T: Serialize + Send + 'static,
    F: FnOnce(&SyncService) -> Result<T, ServiceError> + Send + 'static,
{
    match tokio::task::spawn_blocking(move || operation(&service)).await {
        Ok(Ok(value)) => (success, Json(value)).into_response(),
        Ok(Err(err)) => error_response(status_for(&err), &err.to_string()),
        Err(_) => error_response(StatusCode::INTERNAL_SERVER_ERROR, "request worker failed"),
    }
}

/// Renders an error body.
fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

/// Maps a service failure to an HTTP status.
const fn status_for(err: &ServiceError) -> StatusCode {
    match err {
        ServiceError::SyncInProgress(_) => StatusCode::CONFLICT,
        ServiceError::Disabled(_) => StatusCode::SERVICE_UNAVAILABLE,
        ServiceError::Cluster(err) | ServiceError::Control(ControlError::Cluster(err)) => {
            registry_status(err)
        }
        ServiceError::Control(ControlError::NotFound(_)) => StatusCode::NOT_FOUND,
        ServiceError::Control(ControlError::Conflict(_)) => StatusCode::CONFLICT,
        ServiceError::Control(ControlError::Invalid(_)) => StatusCode::BAD_REQUEST,
        ServiceError::Control(ControlError::Orchestrator(_)) => StatusCode::BAD_GATEWAY,
        ServiceError::Control(ControlError::Store(_)) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Maps a cluster lookup failure to an HTTP status.
const fn registry_status(err: &RegistryError) -> StatusCode {
    match err {
        RegistryError::NotFound(_) => StatusCode::NOT_FOUND,
        RegistryError::Backend(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
