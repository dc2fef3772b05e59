// crates/workflow-sync-config/src/config.rs
// ============================================================================
// Module: Workflow Sync Configuration
// Description: Configuration loading and validation for workflow sync.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: workflow-sync-core, workflow-sync-store-sqlite, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! The path comes from the caller, then `WORKFLOW_SYNC_CONFIG`, then
//! `workflow-sync.toml` in the working directory.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::net::SocketAddr;
use std::path::Component;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use workflow_sync_core::ClusterConfig;
use workflow_sync_core::RetryPolicy;
use workflow_sync_core::RunSyncConfig;
use workflow_sync_core::SpecSyncConfig;
use workflow_sync_core::core::spec::validate_identifier;
use workflow_sync_store_sqlite::SqliteStoreConfig;
use workflow_sync_store_sqlite::SqliteStoreMode;
use workflow_sync_store_sqlite::SqliteSyncMode;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "workflow-sync.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "WORKFLOW_SYNC_CONFIG";
/// Maximum configuration file size in bytes.
const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Default admin API bind address.
const DEFAULT_BIND: &str = "127.0.0.1:8086";
/// Upper bound for a single spec file.
const MAX_SPEC_BYTES_LIMIT: u64 = 4 * 1024 * 1024;
/// Upper bound for orchestrator responses.
const MAX_RESPONSE_BYTES_LIMIT: usize = 64 * 1024 * 1024;
/// Upper bound for a run listing page.
const MAX_PAGE_SIZE: usize = 10_000;
/// Upper bound for concurrent cluster passes.
const MAX_PARALLEL_CLUSTERS: usize = 64;
/// Upper bound for orchestrator retry attempts.
const MAX_RETRY_ATTEMPTS: u32 = 10;
/// Upper bound for configured clusters.
const MAX_CLUSTERS: usize = 1_024;

// ============================================================================
// SECTION: Root Config
// ============================================================================

/// Workflow sync configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WorkflowSyncConfig {
    /// Admin API server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Local store configuration.
    #[serde(default)]
    pub store: StoreConfig,
    /// Spec file source.
    #[serde(default)]
    pub blob_store: Option<BlobStoreConfig>,
    /// Spec sync engine settings.
    #[serde(default)]
    pub spec_sync: SpecSyncSettings,
    /// Run reconciler settings.
    #[serde(default)]
    pub run_sync: RunSyncSettings,
    /// Orchestrator client settings.
    #[serde(default)]
    pub orchestrator: OrchestratorSettings,
    /// Audit sink configuration.
    #[serde(default)]
    pub audit: AuditConfig,
    /// Statically configured clusters.
    #[serde(default)]
    pub clusters: Vec<ClusterConfig>,
}

impl WorkflowSyncConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| {
            ConfigError::Io(format!("{}: {err}", resolved.display()))
        })?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        Self::parse(content)
    }

    /// Parses and validates configuration text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()?;
        self.store.validate()?;
        if let Some(blob_store) = &self.blob_store {
            blob_store.validate()?;
        } else if self.spec_sync.enabled {
            return Err(ConfigError::Invalid("spec_sync requires a [blob_store] section".to_string()));
        }
        self.spec_sync.validate()?;
        self.run_sync.validate()?;
        self.orchestrator.validate()?;
        self.audit.validate()?;
        self.validate_clusters()
    }

    /// Validates static cluster entries.
    fn validate_clusters(&self) -> Result<(), ConfigError> {
        if self.clusters.len() > MAX_CLUSTERS {
            return Err(ConfigError::Invalid("too many clusters".to_string()));
        }
        let mut teams = BTreeSet::new();
        for cluster in &self.clusters {
            self.validate_cluster(cluster)?;
            if !teams.insert(cluster.team.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate cluster for team {}",
                    cluster.team
                )));
            }
        }
        Ok(())
    }

    /// Validates one cluster entry against the orchestrator settings.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for a malformed team or endpoint.
    pub fn validate_cluster(&self, cluster: &ClusterConfig) -> Result<(), ConfigError> {
        validate_identifier("clusters.team", cluster.team.as_str())
            .map_err(|err| ConfigError::Invalid(err.to_string()))?;
        validate_endpoint(
            &format!("clusters[{}].endpoint", cluster.team),
            &cluster.endpoint,
            self.orchestrator.allow_http,
        )
    }
}

// ============================================================================
// SECTION: Server
// ============================================================================

/// Admin API server configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Bind address for the admin API.
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

impl ServerConfig {
    /// Returns the parsed bind address.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the address does not parse.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.bind
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid(format!("invalid server.bind address: {}", self.bind)))
    }

    /// Validates server configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        self.bind_addr().map(|_| ())
    }
}

/// Returns the default bind address.
fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// Local store backend type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StoreType {
    /// In-memory store (lost on restart).
    #[default]
    Memory,
    /// `SQLite`-backed durable store.
    Sqlite,
}

/// Local store configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    /// Store backend type.
    #[serde(rename = "type", default)]
    pub store_type: StoreType,
    /// `SQLite` database path.
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_store_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteStoreMode,
    /// `SQLite` synchronous mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            store_type: StoreType::default(),
            path: None,
            busy_timeout_ms: default_store_busy_timeout_ms(),
            journal_mode: SqliteStoreMode::default(),
            sync_mode: SqliteSyncMode::default(),
        }
    }
}

impl StoreConfig {
    /// Returns the `SQLite` store config when the sqlite backend is selected.
    #[must_use]
    pub fn sqlite_config(&self) -> Option<SqliteStoreConfig> {
        match (self.store_type, &self.path) {
            (StoreType::Sqlite, Some(path)) => Some(SqliteStoreConfig {
                path: path.clone(),
                busy_timeout_ms: self.busy_timeout_ms,
                journal_mode: self.journal_mode,
                sync_mode: self.sync_mode,
            }),
            _ => None,
        }
    }

    /// Validates store configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        match self.store_type {
            StoreType::Memory => {
                if self.path.is_some() {
                    return Err(ConfigError::Invalid("memory store must not set path".to_string()));
                }
                Ok(())
            }
            StoreType::Sqlite => {
                let path = self.path.as_ref().ok_or_else(|| {
                    ConfigError::Invalid("sqlite store requires path".to_string())
                })?;
                validate_path_string("store.path", &path.to_string_lossy())
            }
        }
    }
}

/// Returns the default `SQLite` busy timeout.
const fn default_store_busy_timeout_ms() -> u64 {
    5_000
}

// ============================================================================
// SECTION: Blob Store
// ============================================================================

/// Spec file source.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BlobStoreConfig {
    /// Amazon S3 or an S3-compatible service.
    S3(S3BlobStoreConfig),
    /// Local directory tree.
    Filesystem(FilesystemBlobStoreConfig),
}

impl BlobStoreConfig {
    /// Validates blob store configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        match self {
            Self::S3(config) => config.validate(),
            Self::Filesystem(config) => {
                validate_path_string("blob_store.root", &config.root.to_string_lossy())
            }
        }
    }
}

/// S3 blob store configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct S3BlobStoreConfig {
    /// Bucket holding spec files.
    pub bucket: String,
    /// Optional region (defaults to environment).
    #[serde(default)]
    pub region: Option<String>,
    /// Optional S3-compatible endpoint.
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Force path-style addressing.
    #[serde(default)]
    pub force_path_style: bool,
    /// Allow non-TLS endpoints (explicit opt-in).
    #[serde(default)]
    pub allow_http: bool,
    /// Per-operation timeout in milliseconds.
    #[serde(default = "default_s3_timeout_ms")]
    pub timeout_ms: u64,
}

impl S3BlobStoreConfig {
    /// Validates S3 settings.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.bucket.trim().is_empty() {
            return Err(ConfigError::Invalid("blob_store.bucket must be set".to_string()));
        }
        if let Some(endpoint) = &self.endpoint {
            validate_endpoint("blob_store.endpoint", endpoint, self.allow_http)?;
        }
        if self.timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "blob_store.timeout_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Returns the default S3 operation timeout.
const fn default_s3_timeout_ms() -> u64 {
    10_000
}

/// Filesystem blob store configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FilesystemBlobStoreConfig {
    /// Root directory; spec paths are relative to it.
    pub root: PathBuf,
}

// ============================================================================
// SECTION: Spec Sync
// ============================================================================

/// Spec sync settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SpecSyncSettings {
    /// Enables both timer and on-demand passes.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Timer interval in seconds.
    #[serde(default = "default_spec_interval_secs")]
    pub interval_secs: u64,
    /// Blob prefix holding spec files.
    #[serde(default)]
    pub prefix: String,
    /// Accepted spec file extensions.
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
    /// Maximum accepted spec file size in bytes.
    #[serde(default = "default_max_spec_bytes")]
    pub max_spec_bytes: u64,
}

impl Default for SpecSyncSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: default_spec_interval_secs(),
            prefix: String::new(),
            extensions: default_extensions(),
            max_spec_bytes: default_max_spec_bytes(),
        }
    }
}

impl SpecSyncSettings {
    /// Returns the timer interval.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// Returns the engine configuration.
    #[must_use]
    pub fn engine_config(&self) -> SpecSyncConfig {
        SpecSyncConfig {
            prefix: self.prefix.clone(),
            extensions: self.extensions.clone(),
        }
    }

    /// Validates spec sync settings.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "spec_sync.interval_secs must be greater than zero".to_string(),
            ));
        }
        if !self.prefix.is_empty() {
            validate_prefix(&self.prefix)?;
        }
        if self.extensions.is_empty() {
            return Err(ConfigError::Invalid("spec_sync.extensions must be non-empty".to_string()));
        }
        for extension in &self.extensions {
            let valid = extension.len() > 1
                && extension.starts_with('.')
                && extension[1 ..].chars().all(|ch| ch.is_ascii_alphanumeric());
            if !valid {
                return Err(ConfigError::Invalid(format!(
                    "spec_sync.extensions entry `{extension}` must look like `.yaml`"
                )));
            }
        }
        if self.max_spec_bytes == 0 || self.max_spec_bytes > MAX_SPEC_BYTES_LIMIT {
            return Err(ConfigError::Invalid(format!(
                "spec_sync.max_spec_bytes must be between 1 and {MAX_SPEC_BYTES_LIMIT}"
            )));
        }
        Ok(())
    }
}

/// Returns the default spec sync interval.
const fn default_spec_interval_secs() -> u64 {
    300
}

/// Returns the default spec extensions.
fn default_extensions() -> Vec<String> {
    vec![".yaml".to_string()]
}

/// Returns the default spec size limit.
const fn default_max_spec_bytes() -> u64 {
    256 * 1024
}

// ============================================================================
// SECTION: Run Sync
// ============================================================================

/// Run reconciler settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunSyncSettings {
    /// Enables both timer and on-demand passes.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Timer interval in seconds.
    #[serde(default = "default_run_interval_secs")]
    pub interval_secs: u64,
    /// Look-back window in seconds.
    #[serde(default = "default_lookback_secs")]
    pub lookback_secs: u64,
    /// Staleness threshold in seconds; must be below the look-back window.
    #[serde(default = "default_staleness_secs")]
    pub staleness_secs: u64,
    /// Maximum runs fetched per cluster per pass.
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    /// Create local runs for unmatched external runs.
    #[serde(default)]
    pub adopt_external_runs: bool,
    /// Maximum clusters reconciled concurrently.
    #[serde(default = "default_max_parallel_clusters")]
    pub max_parallel_clusters: usize,
}

impl Default for RunSyncSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: default_run_interval_secs(),
            lookback_secs: default_lookback_secs(),
            staleness_secs: default_staleness_secs(),
            page_size: default_page_size(),
            adopt_external_runs: false,
            max_parallel_clusters: default_max_parallel_clusters(),
        }
    }
}

impl RunSyncSettings {
    /// Returns the timer interval.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// Returns the engine configuration.
    #[must_use]
    pub const fn engine_config(&self) -> RunSyncConfig {
        RunSyncConfig {
            lookback: Duration::from_secs(self.lookback_secs),
            staleness: Duration::from_secs(self.staleness_secs),
            page_size: self.page_size,
            adopt_external_runs: self.adopt_external_runs,
            max_parallel_clusters: self.max_parallel_clusters,
        }
    }

    /// Validates run sync settings.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "run_sync.interval_secs must be greater than zero".to_string(),
            ));
        }
        if self.staleness_secs == 0 || self.staleness_secs >= self.lookback_secs {
            return Err(ConfigError::Invalid(
                "run_sync.staleness_secs must be positive and below lookback_secs".to_string(),
            ));
        }
        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            return Err(ConfigError::Invalid(format!(
                "run_sync.page_size must be between 1 and {MAX_PAGE_SIZE}"
            )));
        }
        if self.max_parallel_clusters == 0 || self.max_parallel_clusters > MAX_PARALLEL_CLUSTERS {
            return Err(ConfigError::Invalid(format!(
                "run_sync.max_parallel_clusters must be between 1 and {MAX_PARALLEL_CLUSTERS}"
            )));
        }
        Ok(())
    }
}

/// Returns the default run sync interval.
const fn default_run_interval_secs() -> u64 {
    60
}

/// Returns the default look-back window (24h).
const fn default_lookback_secs() -> u64 {
    24 * 60 * 60
}

/// Returns the default staleness threshold (6h).
const fn default_staleness_secs() -> u64 {
    6 * 60 * 60
}

/// Returns the default page size.
const fn default_page_size() -> usize {
    500
}

/// Returns the default cluster parallelism.
const fn default_max_parallel_clusters() -> usize {
    4
}

// ============================================================================
// SECTION: Orchestrator
// ============================================================================

/// Orchestrator HTTP client settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OrchestratorSettings {
    /// Connect timeout in milliseconds.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// Whole-request timeout in milliseconds.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// User agent sent to orchestrators.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Allow `http://` cluster endpoints.
    #[serde(default)]
    pub allow_http: bool,
    /// Maximum response body size in bytes.
    #[serde(default = "default_max_response_bytes")]
    pub max_response_bytes: usize,
    /// Retry policy for retryable failures.
    #[serde(default)]
    pub retry: RetryPolicy,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            connect_timeout_ms: default_connect_timeout_ms(),
            request_timeout_ms: default_request_timeout_ms(),
            user_agent: default_user_agent(),
            allow_http: false,
            max_response_bytes: default_max_response_bytes(),
            retry: RetryPolicy::default(),
        }
    }
}

impl OrchestratorSettings {
    /// Validates orchestrator settings.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.connect_timeout_ms == 0 || self.request_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "orchestrator timeouts must be greater than zero".to_string(),
            ));
        }
        if self.connect_timeout_ms > self.request_timeout_ms {
            return Err(ConfigError::Invalid(
                "orchestrator.connect_timeout_ms must not exceed request_timeout_ms".to_string(),
            ));
        }
        if self.user_agent.trim().is_empty() {
            return Err(ConfigError::Invalid("orchestrator.user_agent must be set".to_string()));
        }
        if self.max_response_bytes == 0 || self.max_response_bytes > MAX_RESPONSE_BYTES_LIMIT {
            return Err(ConfigError::Invalid(format!(
                "orchestrator.max_response_bytes must be between 1 and {MAX_RESPONSE_BYTES_LIMIT}"
            )));
        }
        let retry = &self.retry;
        if retry.max_attempts == 0 || retry.max_attempts > MAX_RETRY_ATTEMPTS {
            return Err(ConfigError::Invalid(format!(
                "orchestrator.retry.max_attempts must be between 1 and {MAX_RETRY_ATTEMPTS}"
            )));
        }
        if retry.multiplier == 0 || retry.initial_backoff_ms > retry.max_backoff_ms {
            return Err(ConfigError::Invalid(
                "orchestrator.retry requires multiplier >= 1 and initial_backoff_ms <= \
                 max_backoff_ms"
                    .to_string(),
            ));
        }
        Ok(())
    }
}

/// Returns the default connect timeout.
const fn default_connect_timeout_ms() -> u64 {
    2_000
}

/// Returns the default request timeout.
const fn default_request_timeout_ms() -> u64 {
    10_000
}

/// Returns the default user agent.
fn default_user_agent() -> String {
    format!("workflow-sync/{}", env!("CARGO_PKG_VERSION"))
}

/// Returns the default response size limit.
const fn default_max_response_bytes() -> usize {
    4 * 1024 * 1024
}

// ============================================================================
// SECTION: Audit
// ============================================================================

/// Audit sink selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AuditSinkKind {
    /// JSON lines on stderr.
    #[default]
    Stderr,
    /// JSON lines appended to a file.
    File,
    /// Discard events.
    None,
}

/// Audit logging configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuditConfig {
    /// Sink selection.
    #[serde(default)]
    pub sink: AuditSinkKind,
    /// Log file path for the `file` sink.
    #[serde(default)]
    pub path: Option<String>,
}

impl AuditConfig {
    /// Validates audit configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        match (self.sink, &self.path) {
            (AuditSinkKind::File, Some(path)) => validate_path_string("audit.path", path),
            (AuditSinkKind::File, None) => {
                Err(ConfigError::Invalid("audit sink `file` requires path".to_string()))
            }
            (_, Some(_)) => {
                Err(ConfigError::Invalid("audit.path is only valid with sink `file`".to_string()))
            }
            (_, None) => Ok(()),
        }
    }
}

/// Serde default helper.
const fn default_true() -> bool {
    true
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading or validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from the argument, environment, or default.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates the resolved path against length limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    validate_path_string("config path", &path.to_string_lossy())
}

/// Validates a path string against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    for component in Path::new(trimmed).components() {
        if component.as_os_str().len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}

/// Validates the spec prefix: relative, forward slashes, no traversal.
fn validate_prefix(value: &str) -> Result<(), ConfigError> {
    if value.contains('\\') {
        return Err(ConfigError::Invalid(
            "spec_sync.prefix must not contain backslashes".to_string(),
        ));
    }
    if value.starts_with('/') {
        return Err(ConfigError::Invalid("spec_sync.prefix must be relative".to_string()));
    }
    if value.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("spec_sync.prefix exceeds max length".to_string()));
    }
    for component in Path::new(value).components() {
        match component {
            Component::Normal(segment) if segment.len() <= MAX_PATH_COMPONENT_LENGTH => {}
            _ => {
                return Err(ConfigError::Invalid(
                    "spec_sync.prefix contains an invalid segment".to_string(),
                ));
            }
        }
    }
    Ok(())
}

/// Validates an HTTP(S) endpoint.
fn validate_endpoint(field: &str, endpoint: &str, allow_http: bool) -> Result<(), ConfigError> {
    let trimmed = endpoint.trim();
    if trimmed.starts_with("https://") {
        return Ok(());
    }
    if trimmed.starts_with("http://") {
        if allow_http {
            return Ok(());
        }
        return Err(ConfigError::Invalid(format!("{field} uses http:// without allow_http")));
    }
    Err(ConfigError::Invalid(format!("{field} must include http:// or https://")))
}

// ============================================================================
// SECTION: Tests
// ============================================================================
