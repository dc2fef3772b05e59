// crates/workflow-sync-server/src/audit.rs
// ============================================================================
// Module: Sync Audit Logging
// Description: Structured audit events for sync passes and control actions.
// Purpose: Emit JSON-line records without a logging framework dependency.
// Dependencies: workflow-sync-core, serde, serde_json
// ============================================================================

//! ## Overview
//! Every completed pass, rejected trigger, control action, and per-run
//! reconciliation event becomes one [`SyncAuditEvent`]. Sinks serialize the
//! event as a single JSON line; a failed write never fails the pass.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Serialize;
use serde_json::Value;
use serde_json::json;
use workflow_sync_core::AggregateSyncOutcome;
use workflow_sync_core::ClusterSyncOutcome;
use workflow_sync_core::SyncEvent;
use workflow_sync_core::SyncObserver;
use workflow_sync_core::SyncOutcome;

use crate::guard::SyncKind;
use crate::guard::SyncTrigger;

// ============================================================================
// SECTION: Event
// ============================================================================

/// One audit record.
#[derive(Debug, Clone, Serialize)]
pub struct SyncAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Event-specific payload.
    pub detail: Value,
}

impl SyncAuditEvent {
    /// Builds an event stamped with the current wall-clock time.
    fn now(event: &'static str, detail: Value) -> Self {
        let timestamp_ms =
            SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis();
        Self {
            event,
            timestamp_ms,
            detail,
        }
    }

    /// A spec sync pass finished.
    #[must_use]
    pub fn spec_sync_completed(trigger: SyncTrigger, outcome: &SyncOutcome) -> Self {
        Self::now(
            "spec_sync_completed",
            json!({ "trigger": trigger, "outcome": outcome_value(outcome) }),
        )
    }

    /// A run sync pass over every cluster finished.
    #[must_use]
    pub fn run_sync_completed(trigger: SyncTrigger, outcome: &AggregateSyncOutcome) -> Self {
        Self::now(
            "run_sync_completed",
            json!({
                "trigger": trigger,
                "clusters": outcome.clusters.len(),
                "failed_clusters": outcome.failed_clusters(),
                "error": outcome.error,
            }),
        )
    }

    /// One cluster's reconciliation finished.
    #[must_use]
    pub fn cluster_sync_completed(trigger: SyncTrigger, outcome: &ClusterSyncOutcome) -> Self {
        Self::now(
            "cluster_sync_completed",
            json!({ "trigger": trigger, "outcome": outcome_value(outcome) }),
        )
    }

    /// A trigger was refused because a pass of the same kind was running.
    #[must_use]
    pub fn sync_rejected(kind: SyncKind, trigger: SyncTrigger) -> Self {
        Self::now("sync_rejected", json!({ "kind": kind, "trigger": trigger }))
    }

    /// A pass ended without producing an outcome.
    #[must_use]
    pub fn sync_aborted(kind: SyncKind, trigger: SyncTrigger, reason: &str) -> Self {
        Self::now("sync_aborted", json!({ "kind": kind, "trigger": trigger, "reason": reason }))
    }

    /// A control operation completed or failed.
    #[must_use]
    pub fn workflow_control(action: &'static str, target: &str, error: Option<String>) -> Self {
        Self::now(
            "workflow_control",
            json!({
                "action": action,
                "target": target,
                "outcome": if error.is_some() { "error" } else { "ok" },
                "error": error,
            }),
        )
    }

    /// Wraps a per-item reconciliation event.
    #[must_use]
    pub fn from_sync_event(event: &SyncEvent) -> Self {
        let name = match event {
            SyncEvent::RunMarkedStale {
                ..
            } => "run_marked_stale",
            SyncEvent::ExternalRunSkipped {
                ..
            } => "external_run_skipped",
        };
        Self::now(name, outcome_value(event))
    }
}

/// Serializes a payload, degrading to `null` on failure.
fn outcome_value<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

// ============================================================================
// SECTION: Sinks
// ============================================================================

/// Destination for audit records.
pub trait SyncAuditSink: Send + Sync {
    /// Records one event.
    fn record(&self, event: &SyncAuditEvent);
}

/// Audit sink that logs JSON lines to stderr.
pub struct StderrAuditSink;

impl SyncAuditSink for StderrAuditSink {
    fn record(&self, event: &SyncAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }
}

/// Audit sink that appends JSON lines to a file.
pub struct FileAuditSink {
    /// Append-only file handle.
    file: Mutex<std::fs::File>,
}

impl FileAuditSink {
    /// Opens `path` for appending, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns [`io::Error`] when the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl SyncAuditSink for FileAuditSink {
    fn record(&self, event: &SyncAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }
}

/// Audit sink that drops every record.
pub struct NoopAuditSink;

impl SyncAuditSink for NoopAuditSink {
    fn record(&self, _event: &SyncAuditEvent) {}
}

// ============================================================================
// SECTION: Observer Bridge
// ============================================================================

/// Forwards reconciliation events to an audit sink.
#[derive(Clone)]
pub struct AuditObserver {
    /// Target sink.
    sink: Arc<dyn SyncAuditSink>,
}

impl AuditObserver {
    /// Creates an observer writing to `sink`.
    #[must_use]
    pub fn new(sink: Arc<dyn SyncAuditSink>) -> Self {
        Self {
            sink,
        }
    }
}

impl SyncObserver for AuditObserver {
    fn on_event(&self, event: &SyncEvent) {
        self.sink.record(&SyncAuditEvent::from_sync_event(event));
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use workflow_sync_core::ExternalRunId;
    use workflow_sync_core::SyncEvent;
    use workflow_sync_core::TeamId;

    use super::SyncAuditEvent;

    #[test]
    fn sync_events_keep_their_fields() {
        let event = SyncAuditEvent::from_sync_event(&SyncEvent::ExternalRunSkipped {
            team: TeamId::new("team_a"),
            external_id: ExternalRunId::new("ext-1"),
            workflow_id: "team_a.dau".to_string(),
            reason: "adoption disabled".to_string(),
        });
        assert_eq!(event.event, "external_run_skipped");
        assert_eq!(event.detail["reason"], "adoption disabled");
        assert_eq!(event.detail["external_id"], "ext-1");
    }

    #[test]
    fn control_events_report_errors() {
        let event =
            SyncAuditEvent::workflow_control("pause", "team_a.dau", Some("boom".to_string()));
        assert_eq!(event.detail["outcome"], "error");
        assert_eq!(event.detail["error"], "boom");
    }
}
