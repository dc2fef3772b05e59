// crates/workflow-sync-server/src/lib.rs
// ============================================================================
// Module: Workflow Sync Server
// Description: Host process for the sync engines.
// Purpose: Schedule passes, guard them, audit them, and expose an admin API.
// Dependencies: workflow-sync-core, workflow-sync-config, axum, tokio
// ============================================================================

//! ## Overview
//! The server crate hosts both sync engines and the workflow control surface
//! behind a [`SyncService`]. Timers and the admin API share the same
//! single-flight guards, so a manual trigger and a timer tick never run the
//! same kind of pass concurrently.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod app;
pub mod audit;
pub mod clock;
pub mod guard;
pub mod http;
pub mod scheduler;
pub mod service;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use app::ServerError;
pub use app::WorkflowSyncServer;
pub use audit::AuditObserver;
pub use audit::FileAuditSink;
pub use audit::NoopAuditSink;
pub use audit::StderrAuditSink;
pub use audit::SyncAuditEvent;
pub use audit::SyncAuditSink;
pub use clock::SystemClock;
pub use guard::SyncGuard;
pub use guard::SyncKind;
pub use guard::SyncLease;
pub use guard::SyncTrigger;
pub use http::admin_router;
pub use scheduler::ScheduleIntervals;
pub use scheduler::spawn_schedulers;
pub use service::ServiceError;
pub use service::SyncService;
pub use service::SyncServiceParts;
