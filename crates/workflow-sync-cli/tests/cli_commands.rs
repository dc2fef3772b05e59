// crates/workflow-sync-cli/tests/cli_commands.rs
// ============================================================================
// Module: CLI Command Tests
// Description: Integration tests running the workflow-sync binary.
// Purpose: Ensure one-shot commands print JSON and fail closed.
// Dependencies: workflow-sync-cli binary
// ============================================================================
//! ## Overview
//! Runs the compiled binary against temporary configs, spec roots, and
//! sqlite databases.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    reason = "Test-only panic-based assertions are permitted."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::process::Command;
use std::process::Output;

use serde_json::Value;
use tempfile::TempDir;

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Path of the compiled binary.
fn workflow_sync_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_workflow-sync"))
}

/// Writes `content` as the config file under `root`.
fn write_config(root: &TempDir, content: &str) -> PathBuf {
    let path = root.path().join("workflow-sync.toml");
    fs::write(&path, content).unwrap();
    path
}

/// Runs the binary with `--config` and `args`.
fn run(config: &Path, args: &[&str]) -> Output {
    Command::new(workflow_sync_bin())
        .arg("--config")
        .arg(config)
        .args(args)
        .env("WS_TEST_TOKEN", "t0ken")
        .output()
        .expect("run workflow-sync")
}

/// Parses stdout as JSON.
fn stdout_json(output: &Output) -> Value {
    serde_json::from_slice(&output.stdout).expect("stdout is json")
}

/// Config using a filesystem spec root and the given store section.
fn config_text(specs: &Path, store: &str) -> String {
    format!(
        "{store}\n[blob_store]\ntype = \"filesystem\"\nroot = \"{}\"\n\n[audit]\nsink = \"none\"\n",
        specs.display()
    )
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn config_validate_reports_errors() {
    let root = TempDir::new().unwrap();
    let good = write_config(&root, &config_text(root.path(), ""));
    let output = run(&good, &["config", "validate"]);
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("config ok"));

    let bad = write_config(&root, "[store]\ntype = \"sqlite\"\n");
    let output = run(&bad, &["config", "validate"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("sqlite store requires path"), "unexpected stderr: {stderr}");
}

#[test]
fn sync_specs_prints_outcome() {
    let root = TempDir::new().unwrap();
    let specs = root.path().join("specs");
    fs::create_dir_all(&specs).unwrap();
    fs::write(
        specs.join("dau.yaml"),
        "name: team_a.dau\nteam: team_a\nschedule:\n  cron: \"0 6 * * *\"\n",
    )
    .unwrap();
    fs::write(specs.join("broken.yaml"), "name: [").unwrap();
    let config = write_config(&root, &config_text(&specs, ""));

    let output = run(&config, &["sync", "specs"]);
    assert!(!output.status.success(), "broken spec should fail the exit code");
    let outcome = stdout_json(&output);
    assert_eq!(outcome["created"], 1);
    assert_eq!(outcome["failed"], 1);
    assert_eq!(outcome["errors"][0]["item"], "broken.yaml");
}

#[test]
fn sync_runs_for_unknown_team_fails() {
    let root = TempDir::new().unwrap();
    let config = write_config(&root, &config_text(root.path(), ""));
    let output = run(&config, &["sync", "runs", "--team", "team_z"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("team_z"));
}

#[test]
fn cluster_commands_manage_sqlite_registry() {
    let root = TempDir::new().unwrap();
    let store = format!(
        "[store]\ntype = \"sqlite\"\npath = \"{}\"\n",
        root.path().join("sync.db").display()
    );
    let config = write_config(&root, &config_text(root.path(), &store));

    let output = run(
        &config,
        &[
            "cluster",
            "upsert",
            "--team",
            "team_a",
            "--endpoint",
            "https://airflow-a.internal",
            "--token-env",
            "WS_TEST_TOKEN",
        ],
    );
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(stdout_json(&output)["credential"], "bearer");

    let output = run(
        &config,
        &["cluster", "upsert", "--team", "team_b", "--endpoint", "http://airflow-b"],
    );
    assert!(!output.status.success());

    let output = run(&config, &["cluster", "list"]);
    assert!(output.status.success());
    let listed = stdout_json(&output);
    assert_eq!(listed.as_array().unwrap().len(), 1);
    assert_eq!(listed[0]["team"], "team_a");
    assert!(!String::from_utf8_lossy(&output.stdout).contains("t0ken"));
}

#[test]
fn cluster_commands_require_sqlite() {
    let root = TempDir::new().unwrap();
    let config = write_config(&root, &config_text(root.path(), ""));
    let output = run(&config, &["cluster", "list"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("require the sqlite store"));
}
