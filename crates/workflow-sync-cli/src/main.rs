// crates/workflow-sync-cli/src/main.rs
// ============================================================================
// Module: Workflow Sync CLI Entry Point
// Description: Command dispatcher for the sync server and one-shot passes.
// Purpose: Run the service, trigger passes, and administer clusters.
// Dependencies: clap, serde_json, tokio, workflow-sync-config, workflow-sync-server
// ============================================================================

//! ## Overview
//! `workflow-sync` starts the long-running server or performs a single
//! operation against the configured backends. Results are printed as JSON on
//! stdout; failures go to stderr with a non-zero exit code. A sync pass that
//! completes with recorded errors still prints its outcome but exits with
//! failure.

// ============================================================================
// SECTION: Modules
// ============================================================================


// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::ArgAction;
use clap::Args;
use clap::Parser;
use clap::Subcommand;
use serde::Serialize;
use thiserror::Error;
use workflow_sync_config::StoreType;
use workflow_sync_config::WorkflowSyncConfig;
use workflow_sync_core::ClusterConfig;
use workflow_sync_core::ClusterCredential;
use workflow_sync_core::TeamId;
use workflow_sync_server::SyncTrigger;
use workflow_sync_server::WorkflowSyncServer;
use workflow_sync_store_sqlite::SqliteWorkflowStore;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "workflow-sync", disable_help_subcommand = true, version)]
struct Cli {
    /// Config file path (defaults to workflow-sync.toml or the env override).
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the schedulers and the admin API.
    Serve,
    /// Run one sync pass and print its outcome.
    Sync {
        /// Selected sync subcommand.
        #[command(subcommand)]
        command: SyncCommand,
    },
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
    /// Cluster registry administration (sqlite store only).
    Cluster {
        /// Selected cluster subcommand.
        #[command(subcommand)]
        command: ClusterCommand,
    },
}

/// Sync subcommands.
#[derive(Subcommand, Debug)]
enum SyncCommand {
    /// Reconcile workflow definitions with spec files.
    Specs,
    /// Reconcile local runs with orchestrator clusters.
    Runs(SyncRunsCommand),
}

/// Arguments for `sync runs`.
#[derive(Args, Debug)]
struct SyncRunsCommand {
    /// Reconcile only this team's cluster.
    #[arg(long, value_name = "TEAM")]
    team: Option<String>,
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Load and validate the config file.
    Validate,
}

/// Cluster subcommands.
#[derive(Subcommand, Debug)]
enum ClusterCommand {
    /// Create or replace the cluster for a team.
    Upsert(ClusterUpsertCommand),
    /// List registered clusters.
    List,
}

/// Arguments for `cluster upsert`.
#[derive(Args, Debug)]
struct ClusterUpsertCommand {
    /// Owning team.
    #[arg(long, value_name = "TEAM")]
    team: String,
    /// Orchestrator base endpoint.
    #[arg(long, value_name = "URL")]
    endpoint: String,
    /// Environment variable holding a bearer token.
    #[arg(long, value_name = "VAR", conflicts_with = "username")]
    token_env: Option<String>,
    /// Basic auth username.
    #[arg(long, value_name = "USER", requires = "password_env")]
    username: Option<String>,
    /// Environment variable holding the basic auth password.
    #[arg(long, value_name = "VAR", requires = "username")]
    password_env: Option<String>,
    /// Register the cluster as inactive.
    #[arg(long, action = ArgAction::SetTrue)]
    inactive: bool,
}

/// Cluster listing entry with the credential redacted.
#[derive(Debug, Serialize)]
struct ClusterSummary {
    /// Owning team.
    team: TeamId,
    /// Orchestrator base endpoint.
    endpoint: String,
    /// Credential kind label.
    credential: &'static str,
    /// Whether the cluster participates in reconciliation.
    active: bool,
}

impl From<&ClusterConfig> for ClusterSummary {
    fn from(cluster: &ClusterConfig) -> Self {
        Self {
            team: cluster.team.clone(),
            endpoint: cluster.endpoint.clone(),
            credential: cluster.credential.kind(),
            active: cluster.active,
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`].
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    match run(Cli::parse()).await {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
async fn run(cli: Cli) -> CliResult<ExitCode> {
    let config = load_config(cli.config)?;
    match cli.command {
        Commands::Serve => command_serve(config).await,
        Commands::Sync {
            command,
        } => command_sync(config, command).await,
        Commands::Config {
            command: ConfigCommand::Validate,
        } => {
            write_stdout_line("config ok")?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Cluster {
            command,
        } => {
            tokio::task::spawn_blocking(move || command_cluster(&config, command))
                .await
                .map_err(|err| CliError::new(format!("cluster command join failed: {err}")))?
        }
    }
}

/// Loads and validates the config file.
fn load_config(path: Option<PathBuf>) -> CliResult<WorkflowSyncConfig> {
    WorkflowSyncConfig::load(path.as_deref())
        .map_err(|err| CliError::new(format!("failed to load config: {err}")))
}

// ============================================================================
// SECTION: Serve Command
// ============================================================================

/// Executes the `serve` command.
async fn command_serve(config: WorkflowSyncConfig) -> CliResult<ExitCode> {
    let server = tokio::task::spawn_blocking(move || WorkflowSyncServer::from_config(config))
        .await
        .map_err(|err| CliError::new(format!("server init join failed: {err}")))?
        .map_err(|err| CliError::new(format!("server init failed: {err}")))?;
    server.serve().await.map_err(|err| CliError::new(format!("server failed: {err}")))?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Sync Commands
// ============================================================================

/// Executes one sync pass on the blocking pool.
async fn command_sync(config: WorkflowSyncConfig, command: SyncCommand) -> CliResult<ExitCode> {
    tokio::task::spawn_blocking(move || run_sync_pass(config, &command))
        .await
        .map_err(|err| CliError::new(format!("sync join failed: {err}")))?
}

/// Builds the service and runs the selected pass.
fn run_sync_pass(config: WorkflowSyncConfig, command: &SyncCommand) -> CliResult<ExitCode> {
    let server = WorkflowSyncServer::from_config(config)
        .map_err(|err| CliError::new(format!("server init failed: {err}")))?;
    let service = server.service();
    let fail = |err: workflow_sync_server::ServiceError| CliError::new(err.to_string());
    match command {
        SyncCommand::Specs => {
            let outcome = service.trigger_spec_sync(SyncTrigger::Manual).map_err(fail)?;
            write_json(&outcome)?;
            Ok(exit_code(outcome.errors.is_empty()))
        }
        SyncCommand::Runs(SyncRunsCommand {
            team: Some(team),
        }) => {
            let outcome = service
                .trigger_cluster_run_sync(&TeamId::new(team.as_str()), SyncTrigger::Manual)
                .map_err(fail)?;
            write_json(&outcome)?;
            Ok(exit_code(!outcome.is_failed()))
        }
        SyncCommand::Runs(SyncRunsCommand {
            team: None,
        }) => {
            let outcome = service.trigger_run_sync(SyncTrigger::Manual).map_err(fail)?;
            write_json(&outcome)?;
            Ok(exit_code(outcome.error.is_none() && outcome.failed_clusters() == 0))
        }
    }
}

/// Maps a pass result to an exit code.
fn exit_code(clean: bool) -> ExitCode {
    if clean { ExitCode::SUCCESS } else { ExitCode::FAILURE }
}

// ============================================================================
// SECTION: Cluster Commands
// ============================================================================

/// Executes a cluster administration command against the sqlite store.
fn command_cluster(config: &WorkflowSyncConfig, command: ClusterCommand) -> CliResult<ExitCode> {
    let store = open_cluster_store(config)?;
    match command {
        ClusterCommand::Upsert(args) => {
            let cluster = cluster_from_args(args, |name| std::env::var(name).ok())?;
            config.validate_cluster(&cluster).map_err(|err| CliError::new(err.to_string()))?;
            store.upsert_cluster(&cluster).map_err(|err| CliError::new(err.to_string()))?;
            write_json(&ClusterSummary::from(&cluster))?;
        }
        ClusterCommand::List => {
            let clusters = store.list_clusters().map_err(|err| CliError::new(err.to_string()))?;
            let summaries: Vec<ClusterSummary> = clusters.iter().map(ClusterSummary::from).collect();
            write_json(&summaries)?;
        }
    }
    Ok(ExitCode::SUCCESS)
}

/// Opens the configured sqlite store.
fn open_cluster_store(config: &WorkflowSyncConfig) -> CliResult<SqliteWorkflowStore> {
    if config.store.store_type != StoreType::Sqlite {
        return Err(CliError::new("cluster commands require the sqlite store"));
    }
    let sqlite_config = config
        .store
        .sqlite_config()
        .ok_or_else(|| CliError::new("sqlite store requires path"))?;
    SqliteWorkflowStore::new(&sqlite_config)
        .map_err(|err| CliError::new(format!("failed to open store: {err}")))
}

/// Builds a cluster record, reading secrets through `env`.
fn cluster_from_args(
    args: ClusterUpsertCommand,
    env: impl Fn(&str) -> Option<String>,
) -> CliResult<ClusterConfig> {
    let secret = |name: &str| {
        env(name)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| CliError::new(format!("environment variable {name} is not set")))
    };
    let credential = match (args.token_env, args.username, args.password_env) {
        (Some(token_env), _, _) => ClusterCredential::Bearer {
            token: secret(&token_env)?,
        },
        (None, Some(username), Some(password_env)) => ClusterCredential::Basic {
            username,
            password: secret(&password_env)?,
        },
        _ => ClusterCredential::None,
    };
    Ok(ClusterConfig {
        team: TeamId::new(args.team),
        endpoint: args.endpoint,
        credential,
        active: !args.inactive,
    })
}

// ============================================================================
// SECTION: Output
// ============================================================================

/// Writes a value as pretty JSON to stdout.
fn write_json<T: Serialize>(value: &T) -> CliResult<()> {
    let rendered = serde_json::to_string_pretty(value)
        .map_err(|err| CliError::new(format!("failed to render output: {err}")))?;
    write_stdout_line(&rendered)
}

/// Writes a line to stdout.
fn write_stdout_line(message: &str) -> CliResult<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
        .map_err(|err| CliError::new(format!("failed to write stdout: {err}")))
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let mut stderr = std::io::stderr();
    let _ = writeln!(&mut stderr, "{message}");
    ExitCode::FAILURE
}
