// crates/workflow-sync-config/tests/config_validation.rs
// ============================================================================
// Module: Config Validation Tests
// Description: Defaults, loading, and fail-closed validation rules.
// ============================================================================
//! ## Overview
//! Validates that `workflow-sync.toml` parses with sensible defaults and that
//! inconsistent settings are rejected before any engine starts.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    reason = "Test-only assertions and helpers are permitted."
)]

use std::fs;
use std::time::Duration;

use tempfile::TempDir;
use workflow_sync_config::AuditSinkKind;
use workflow_sync_config::BlobStoreConfig;
use workflow_sync_config::ConfigError;
use workflow_sync_config::StoreType;
use workflow_sync_config::WorkflowSyncConfig;
use workflow_sync_core::ClusterCredential;

/// Smallest valid config.
const MINIMAL: &str = r#"
[blob_store]
type = "filesystem"
root = "./specs"
"#;

/// Parses `content` and returns the validation message, panicking otherwise.
fn invalid(content: &str) -> String {
    match WorkflowSyncConfig::parse(content) {
        Err(ConfigError::Invalid(message)) => message,
        other => panic!("expected invalid config, got {other:?}"),
    }
}

#[test]
fn minimal_config_uses_defaults() {
    let config = WorkflowSyncConfig::parse(MINIMAL).unwrap();
    assert_eq!(config.store.store_type, StoreType::Memory);
    assert_eq!(config.server.bind_addr().unwrap().port(), 8086);
    assert!(config.spec_sync.enabled);
    assert_eq!(config.spec_sync.extensions, vec![".yaml".to_string()]);
    let engine = config.run_sync.engine_config();
    assert_eq!(engine.lookback, Duration::from_secs(86_400));
    assert_eq!(engine.staleness, Duration::from_secs(21_600));
    assert!(!engine.adopt_external_runs);
    assert_eq!(config.orchestrator.retry.max_attempts, 3);
    assert_eq!(config.audit.sink, AuditSinkKind::Stderr);
    assert!(config.clusters.is_empty());
}

#[test]
fn full_config_round_trips_into_engine_settings() {
    let config = WorkflowSyncConfig::parse(
        r#"
[server]
bind = "0.0.0.0:9000"

[store]
type = "sqlite"
path = "/var/lib/workflow-sync/sync.db"
journal_mode = "wal"
sync_mode = "normal"

[blob_store]
type = "s3"
bucket = "platform-specs"
region = "eu-west-1"
endpoint = "http://minio:9000"
force_path_style = true
allow_http = true

[spec_sync]
interval_secs = 120
prefix = "metrics/"
extensions = [".yaml", ".yml"]

[run_sync]
lookback_secs = 7200
staleness_secs = 3600
page_size = 50
adopt_external_runs = true
max_parallel_clusters = 8

[orchestrator]
request_timeout_ms = 5000
allow_http = true

[orchestrator.retry]
max_attempts = 5
initial_backoff_ms = 50
max_backoff_ms = 1000

[audit]
sink = "file"
path = "/var/log/workflow-sync/audit.jsonl"

[[clusters]]
team = "team_a"
endpoint = "http://airflow-a:8080"
credential = { type = "basic", username = "svc", password = "pw" }

[[clusters]]
team = "team_b"
endpoint = "https://airflow-b.internal"
active = false
"#,
    )
    .unwrap();
    let sqlite = config.store.sqlite_config().unwrap();
    assert_eq!(sqlite.path.to_string_lossy(), "/var/lib/workflow-sync/sync.db");
    let BlobStoreConfig::S3(s3) = config.blob_store.as_ref().unwrap() else {
        panic!("expected s3 blob store");
    };
    assert!(s3.force_path_style);
    assert_eq!(s3.timeout_ms, 10_000);
    assert_eq!(config.spec_sync.engine_config().prefix, "metrics/");
    assert!(config.spec_sync.engine_config().accepts("metrics/x.yml"));
    assert_eq!(config.run_sync.engine_config().max_parallel_clusters, 8);
    assert_eq!(config.orchestrator.retry.max_attempts, 5);
    assert_eq!(config.orchestrator.retry.multiplier, 2);
    assert_eq!(config.clusters.len(), 2);
    assert!(matches!(config.clusters[0].credential, ClusterCredential::Basic { .. }));
    assert!(!config.clusters[1].active);
}

#[test]
fn staleness_must_be_shorter_than_lookback() {
    let message = invalid(&format!("{MINIMAL}\n[run_sync]\nlookback_secs = 600\nstaleness_secs = 600\n"));
    assert!(message.contains("staleness_secs"), "{message}");
}

#[test]
fn spec_sync_requires_blob_store_unless_disabled() {
    let message = invalid("[run_sync]\nenabled = true\n");
    assert!(message.contains("blob_store"), "{message}");
    assert!(WorkflowSyncConfig::parse("[spec_sync]\nenabled = false\n").is_ok());
}

#[test]
fn sqlite_store_requires_path_and_memory_forbids_it() {
    assert!(invalid(&format!("{MINIMAL}\n[store]\ntype = \"sqlite\"\n")).contains("requires path"));
    assert!(invalid(&format!("{MINIMAL}\n[store]\npath = \"x.db\"\n")).contains("must not set path"));
}

#[test]
fn plain_http_cluster_needs_opt_in() {
    let content = format!("{MINIMAL}\n[[clusters]]\nteam = \"a\"\nendpoint = \"http://airflow\"\n");
    assert!(invalid(&content).contains("allow_http"));
}

#[test]
fn duplicate_cluster_teams_are_rejected() {
    let content = format!(
        "{MINIMAL}\n[[clusters]]\nteam = \"a\"\nendpoint = \"https://one\"\n\n[[clusters]]\nteam = \
         \"a\"\nendpoint = \"https://two\"\nactive = false\n"
    );
    assert!(invalid(&content).contains("duplicate cluster"));
}

#[test]
fn bad_extensions_and_prefixes_are_rejected() {
    assert!(invalid(&format!("{MINIMAL}\n[spec_sync]\nextensions = [\"yaml\"]\n")).contains("extensions"));
    assert!(invalid(&format!("{MINIMAL}\n[spec_sync]\nprefix = \"../up\"\n")).contains("prefix"));
}

#[test]
fn file_audit_sink_requires_path() {
    assert!(invalid(&format!("{MINIMAL}\n[audit]\nsink = \"file\"\n")).contains("requires path"));
}

#[test]
fn unknown_keys_fail_parsing() {
    let result = WorkflowSyncConfig::parse(&format!("{MINIMAL}\n[run_sync]\nlookback = 5\n"));
    assert!(matches!(result, Err(ConfigError::Parse(_))));
}

#[test]
fn load_reads_explicit_path_and_reports_missing_files() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("workflow-sync.toml");
    fs::write(&path, MINIMAL).unwrap();
    let config = WorkflowSyncConfig::load(Some(&path)).unwrap();
    assert!(matches!(config.blob_store, Some(BlobStoreConfig::Filesystem(_))));

    let missing = WorkflowSyncConfig::load(Some(&dir.path().join("absent.toml")));
    assert!(matches!(missing, Err(ConfigError::Io(_))));
}

#[test]
fn oversized_config_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("big.toml");
    let padding = "# padding\n".repeat(110_000);
    fs::write(&path, format!("{MINIMAL}{padding}")).unwrap();
    let result = WorkflowSyncConfig::load(Some(&path));
    assert!(matches!(result, Err(ConfigError::Invalid(message)) if message.contains("size limit")));
}
