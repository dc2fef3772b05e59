// crates/workflow-sync-store-sqlite/src/store.rs
// ============================================================================
// Module: SQLite Workflow Store
// Description: Durable workflow registry, run store, and cluster registry.
// Purpose: Persist definitions, run history, and cluster bindings in SQLite.
// Dependencies: workflow-sync-core, rusqlite, serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! One connection guarded by a mutex serves all three ports. Definitions are
//! keyed by name, runs by local id with a unique index on the external id,
//! and clusters by team. Rows that fail to decode are reported as corrupt
//! rather than skipped.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use rusqlite::Connection;
use rusqlite::ErrorCode;
use rusqlite::OpenFlags;
use rusqlite::OptionalExtension;
use rusqlite::Row;
use rusqlite::params;
use serde::Deserialize;
use thiserror::Error;
use workflow_sync_core::ClusterConfig;
use workflow_sync_core::ClusterCredential;
use workflow_sync_core::ClusterRegistry;
use workflow_sync_core::DefinitionOrigin;
use workflow_sync_core::DefinitionStatus;
use workflow_sync_core::ExecutionRun;
use workflow_sync_core::ExternalRunId;
use workflow_sync_core::RegistryError;
use workflow_sync_core::RunId;
use workflow_sync_core::RunStatus;
use workflow_sync_core::RunStore;
use workflow_sync_core::Schedule;
use workflow_sync_core::StoreError;
use workflow_sync_core::TeamId;
use workflow_sync_core::Timestamp;
use workflow_sync_core::WorkflowDefinition;
use workflow_sync_core::WorkflowName;
use workflow_sync_core::WorkflowRegistry;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// `SQLite` schema version for the store.
const SCHEMA_VERSION: i64 = 1;
/// Default busy timeout (ms).
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;

/// Column list for definition queries.
const DEFINITION_COLUMNS: &str = "name, team, description, cron, timezone, origin, spec_path, \
                                  spec_digest, status, created_at, updated_at, deleted_at";
/// Column list for run queries.
const RUN_COLUMNS: &str = "run_id, external_id, workflow, team, status, created_at, started_at, \
                           ended_at, last_synced_at, progress";

// ============================================================================
// SECTION: Config
// ============================================================================

/// `SQLite` journal mode configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteStoreMode {
    /// WAL journal mode.
    #[default]
    Wal,
    /// Delete journal mode.
    Delete,
}

impl SqliteStoreMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Wal => "wal",
            Self::Delete => "delete",
        }
    }
}

/// `SQLite` sync mode configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteSyncMode {
    /// Full synchronous mode.
    #[default]
    Full,
    /// Normal synchronous mode.
    Normal,
}

impl SqliteSyncMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Normal => "normal",
        }
    }
}

/// Configuration for the `SQLite` workflow store.
#[derive(Debug, Clone, Deserialize)]
pub struct SqliteStoreConfig {
    /// Path to the `SQLite` database file.
    pub path: PathBuf,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteStoreMode,
    /// `SQLite` sync mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
}

impl SqliteStoreConfig {
    /// Creates a config for `path` with default tuning.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            journal_mode: SqliteStoreMode::default(),
            sync_mode: SqliteSyncMode::default(),
        }
    }
}

/// Returns the default busy timeout for `SQLite` connections.
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// `SQLite` store errors.
#[derive(Debug, Error)]
pub enum SqliteStoreError {
    /// Store I/O error.
    #[error("sqlite store io error: {0}")]
    Io(String),
    /// `SQLite` engine error.
    #[error("sqlite store db error: {0}")]
    Db(String),
    /// Uniqueness constraint violated.
    #[error("sqlite store conflict: {0}")]
    Conflict(String),
    /// Addressed row does not exist.
    #[error("sqlite store missing row: {0}")]
    NotFound(String),
    /// Stored row could not be decoded.
    #[error("sqlite store corruption: {0}")]
    Corrupt(String),
    /// Store schema version mismatch.
    #[error("sqlite store version mismatch: {0}")]
    VersionMismatch(String),
    /// Invalid store input.
    #[error("sqlite store invalid data: {0}")]
    Invalid(String),
}

impl From<rusqlite::Error> for SqliteStoreError {
    fn from(error: rusqlite::Error) -> Self {
        match &error {
            rusqlite::Error::SqliteFailure(failure, _)
                if failure.code == ErrorCode::ConstraintViolation =>
            {
                Self::Conflict(error.to_string())
            }
            _ => Self::Db(error.to_string()),
        }
    }
}

impl From<SqliteStoreError> for StoreError {
    fn from(error: SqliteStoreError) -> Self {
        match error {
            SqliteStoreError::Conflict(message) => Self::Conflict(message),
            SqliteStoreError::NotFound(message) => Self::NotFound(message),
            SqliteStoreError::Corrupt(message) | SqliteStoreError::VersionMismatch(message) => {
                Self::Corrupt(message)
            }
            SqliteStoreError::Io(message)
            | SqliteStoreError::Db(message)
            | SqliteStoreError::Invalid(message) => Self::Store(message),
        }
    }
}

impl From<SqliteStoreError> for RegistryError {
    fn from(error: SqliteStoreError) -> Self {
        Self::Backend(error.to_string())
    }
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// `SQLite`-backed workflow store.
#[derive(Clone)]
pub struct SqliteWorkflowStore {
    /// Shared `SQLite` connection guarded by a mutex.
    connection: Arc<Mutex<Connection>>,
}

impl SqliteWorkflowStore {
    /// Opens (and if needed creates) the store.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the database cannot be opened or
    /// initialized.
    pub fn new(config: &SqliteStoreConfig) -> Result<Self, SqliteStoreError> {
        validate_store_path(&config.path)?;
        ensure_parent_dir(&config.path)?;
        let mut connection = open_connection(config)?;
        initialize_schema(&mut connection)?;
        Ok(Self {
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    /// Inserts or replaces the cluster bound to `cluster.team`.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the write fails.
    pub fn upsert_cluster(&self, cluster: &ClusterConfig) -> Result<(), SqliteStoreError> {
        let credential = serde_json::to_string(&cluster.credential)
            .map_err(|err| SqliteStoreError::Invalid(err.to_string()))?;
        let guard = self.lock()?;
        guard.execute(
            "INSERT INTO clusters (team, endpoint, credential_json, active) VALUES (?1, ?2, ?3, \
             ?4) ON CONFLICT(team) DO UPDATE SET endpoint = excluded.endpoint, credential_json = \
             excluded.credential_json, active = excluded.active",
            params![cluster.team.as_str(), cluster.endpoint, credential, cluster.active],
        )?;
        drop(guard);
        Ok(())
    }

    /// Lists every cluster, active or not, ordered by team.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the read fails or a row is corrupt.
    pub fn list_clusters(&self) -> Result<Vec<ClusterConfig>, SqliteStoreError> {
        self.query_clusters(
            "SELECT team, endpoint, credential_json, active FROM clusters ORDER BY team",
        )
    }

    /// Acquires the connection.
    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, SqliteStoreError> {
        self.connection.lock().map_err(|_| SqliteStoreError::Db("mutex poisoned".to_string()))
    }

    /// Runs a cluster query with no parameters.
    fn query_clusters(&self, sql: &str) -> Result<Vec<ClusterConfig>, SqliteStoreError> {
        let guard = self.lock()?;
        let mut statement = guard.prepare(sql)?;
        let rows = statement
            .query_map(params![], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, bool>(3)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        drop(statement);
        drop(guard);
        rows.into_iter()
            .map(|(team, endpoint, credential_json, active)| {
                let credential: ClusterCredential = serde_json::from_str(&credential_json)
                    .map_err(|err| {
                        SqliteStoreError::Corrupt(format!("cluster {team} credential: {err}"))
                    })?;
                Ok(ClusterConfig {
                    team: TeamId::new(team),
                    endpoint,
                    credential,
                    active,
                })
            })
            .collect()
    }

    /// Loads one definition.
    fn load_definition(
        &self,
        name: &WorkflowName,
    ) -> Result<Option<WorkflowDefinition>, SqliteStoreError> {
        let guard = self.lock()?;
        let row = guard
            .query_row(
                &format!("SELECT {DEFINITION_COLUMNS} FROM workflow_definitions WHERE name = ?1"),
                params![name.as_str()],
                DefinitionRow::read,
            )
            .optional()?;
        drop(guard);
        row.map(DefinitionRow::into_definition).transpose()
    }

    /// Writes one definition.
    fn save_definition(&self, definition: &WorkflowDefinition) -> Result<(), SqliteStoreError> {
        let guard = self.lock()?;
        guard.execute(
            &format!(
                "INSERT INTO workflow_definitions ({DEFINITION_COLUMNS}) VALUES (?1, ?2, ?3, ?4, \
                 ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12) ON CONFLICT(name) DO UPDATE SET team = \
                 excluded.team, description = excluded.description, cron = excluded.cron, \
                 timezone = excluded.timezone, origin = excluded.origin, spec_path = \
                 excluded.spec_path, spec_digest = excluded.spec_digest, status = \
                 excluded.status, created_at = excluded.created_at, updated_at = \
                 excluded.updated_at, deleted_at = excluded.deleted_at"
            ),
            params![
                definition.name.as_str(),
                definition.team.as_str(),
                definition.description,
                definition.schedule.cron,
                definition.schedule.timezone,
                definition.origin.as_str(),
                definition.spec_path,
                definition.spec_digest,
                definition.status.as_str(),
                definition.created_at.as_unix_millis(),
                definition.updated_at.as_unix_millis(),
                definition.deleted_at.map(Timestamp::as_unix_millis),
            ],
        )?;
        drop(guard);
        Ok(())
    }

    /// Lists all definitions.
    fn load_definitions(&self) -> Result<Vec<WorkflowDefinition>, SqliteStoreError> {
        let guard = self.lock()?;
        let mut statement = guard.prepare(&format!(
            "SELECT {DEFINITION_COLUMNS} FROM workflow_definitions ORDER BY name"
        ))?;
        let rows = statement
            .query_map(params![], DefinitionRow::read)?
            .collect::<Result<Vec<_>, _>>()?;
        drop(statement);
        drop(guard);
        rows.into_iter().map(DefinitionRow::into_definition).collect()
    }

    /// Writes a run, inserting or replacing.
    fn write_run(&self, run: &ExecutionRun, insert: bool) -> Result<(), SqliteStoreError> {
        let external_id = run.external_id.as_ref().map(ExternalRunId::as_str);
        let started_at = run.started_at.map(Timestamp::as_unix_millis);
        let ended_at = run.ended_at.map(Timestamp::as_unix_millis);
        let last_synced_at = run.last_synced_at.map(Timestamp::as_unix_millis);
        let sql = if insert {
            format!(
                "INSERT INTO execution_runs ({RUN_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, \
                 ?8, ?9, ?10)"
            )
        } else {
            "UPDATE execution_runs SET external_id = ?2, workflow = ?3, team = ?4, status = ?5, \
             created_at = ?6, started_at = ?7, ended_at = ?8, last_synced_at = ?9, progress = \
             ?10 WHERE run_id = ?1"
                .to_string()
        };
        let guard = self.lock()?;
        let changed = guard.execute(
            &sql,
            params![
                run.run_id.as_str(),
                external_id,
                run.workflow.as_str(),
                run.team.as_str(),
                run.status.as_str(),
                run.created_at.as_unix_millis(),
                started_at,
                ended_at,
                last_synced_at,
                run.progress,
            ],
        )?;
        drop(guard);
        if changed == 0 {
            return Err(SqliteStoreError::NotFound(format!("run {}", run.run_id)));
        }
        Ok(())
    }

    /// Loads runs matching a `WHERE` clause.
    fn query_runs(
        &self,
        clause: &str,
        values: impl rusqlite::Params,
    ) -> Result<Vec<ExecutionRun>, SqliteStoreError> {
        let guard = self.lock()?;
        let mut statement =
            guard.prepare(&format!("SELECT {RUN_COLUMNS} FROM execution_runs WHERE {clause}"))?;
        let rows = statement.query_map(values, RunRow::read)?.collect::<Result<Vec<_>, _>>()?;
        drop(statement);
        drop(guard);
        rows.into_iter().map(RunRow::into_run).collect()
    }
}

// ============================================================================
// SECTION: Port Implementations
// ============================================================================

impl WorkflowRegistry for SqliteWorkflowStore {
    fn get(&self, name: &WorkflowName) -> Result<Option<WorkflowDefinition>, StoreError> {
        self.load_definition(name).map_err(StoreError::from)
    }

    fn upsert(&self, definition: &WorkflowDefinition) -> Result<(), StoreError> {
        self.save_definition(definition).map_err(StoreError::from)
    }

    fn list(&self) -> Result<Vec<WorkflowDefinition>, StoreError> {
        self.load_definitions().map_err(StoreError::from)
    }
}

impl RunStore for SqliteWorkflowStore {
    fn insert(&self, run: &ExecutionRun) -> Result<(), StoreError> {
        self.write_run(run, true).map_err(StoreError::from)
    }

    fn update(&self, run: &ExecutionRun) -> Result<(), StoreError> {
        self.write_run(run, false).map_err(StoreError::from)
    }

    fn get(&self, run_id: &RunId) -> Result<Option<ExecutionRun>, StoreError> {
        let mut runs = self.query_runs("run_id = ?1", params![run_id.as_str()])?;
        Ok(runs.pop())
    }

    fn find_by_external_id(
        &self,
        external_id: &ExternalRunId,
    ) -> Result<Option<ExecutionRun>, StoreError> {
        let mut runs = self.query_runs("external_id = ?1", params![external_id.as_str()])?;
        Ok(runs.pop())
    }

    fn list_open_for_team(
        &self,
        team: &TeamId,
        since: Timestamp,
    ) -> Result<Vec<ExecutionRun>, StoreError> {
        let open = RunStatus::ALL
            .iter()
            .filter(|status| !status.is_terminal())
            .map(|status| format!("'{}'", status.as_str()))
            .collect::<Vec<_>>()
            .join(", ");
        let clause = format!(
            "team = ?1 AND status IN ({open}) AND COALESCE(started_at, created_at) >= ?2 ORDER \
             BY created_at, run_id"
        );
        Ok(self.query_runs(&clause, params![team.as_str(), since.as_unix_millis()])?)
    }
}

impl ClusterRegistry for SqliteWorkflowStore {
    fn resolve_for_team(&self, team: &TeamId) -> Result<ClusterConfig, RegistryError> {
        self.list_active()?
            .into_iter()
            .find(|cluster| &cluster.team == team)
            .ok_or_else(|| RegistryError::NotFound(team.clone()))
    }

    fn list_active(&self) -> Result<Vec<ClusterConfig>, RegistryError> {
        Ok(self.query_clusters(
            "SELECT team, endpoint, credential_json, active FROM clusters WHERE active = 1 ORDER \
             BY team",
        )?)
    }
}

// ============================================================================
// SECTION: Row Decoding
// ============================================================================

/// Raw `workflow_definitions` row.
struct DefinitionRow {
    /// `name` column.
    name: String,
    /// `team` column.
    team: String,
    /// `description` column.
    description: Option<String>,
    /// `cron` column.
    cron: String,
    /// `timezone` column.
    timezone: String,
    /// `origin` column.
    origin: String,
    /// `spec_path` column.
    spec_path: Option<String>,
    /// `spec_digest` column.
    spec_digest: Option<String>,
    /// `status` column.
    status: String,
    /// `created_at` column.
    created_at: i64,
    /// `updated_at` column.
    updated_at: i64,
    /// `deleted_at` column.
    deleted_at: Option<i64>,
}

impl DefinitionRow {
    /// Reads the columns listed in `DEFINITION_COLUMNS`.
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            name: row.get(0)?,
            team: row.get(1)?,
            description: row.get(2)?,
            cron: row.get(3)?,
            timezone: row.get(4)?,
            origin: row.get(5)?,
            spec_path: row.get(6)?,
            spec_digest: row.get(7)?,
            status: row.get(8)?,
            created_at: row.get(9)?,
            updated_at: row.get(10)?,
            deleted_at: row.get(11)?,
        })
    }

    /// Decodes enumerations into a domain record.
    fn into_definition(self) -> Result<WorkflowDefinition, SqliteStoreError> {
        let origin = DefinitionOrigin::parse(&self.origin).ok_or_else(|| {
            SqliteStoreError::Corrupt(format!("definition {}: origin {}", self.name, self.origin))
        })?;
        let status = DefinitionStatus::parse(&self.status).ok_or_else(|| {
            SqliteStoreError::Corrupt(format!("definition {}: status {}", self.name, self.status))
        })?;
        Ok(WorkflowDefinition {
            name: WorkflowName::new(self.name),
            team: TeamId::new(self.team),
            description: self.description,
            schedule: Schedule {
                cron: self.cron,
                timezone: self.timezone,
            },
            origin,
            spec_path: self.spec_path,
            spec_digest: self.spec_digest,
            status,
            created_at: Timestamp::from_unix_millis(self.created_at),
            updated_at: Timestamp::from_unix_millis(self.updated_at),
            deleted_at: self.deleted_at.map(Timestamp::from_unix_millis),
        })
    }
}

/// Raw `execution_runs` row.
struct RunRow {
    /// `run_id` column.
    run_id: String,
    /// `external_id` column.
    external_id: Option<String>,
    /// `workflow` column.
    workflow: String,
    /// `team` column.
    team: String,
    /// `status` column.
    status: String,
    /// `created_at` column.
    created_at: i64,
    /// `started_at` column.
    started_at: Option<i64>,
    /// `ended_at` column.
    ended_at: Option<i64>,
    /// `last_synced_at` column.
    last_synced_at: Option<i64>,
    /// `progress` column.
    progress: Option<String>,
}

impl RunRow {
    /// Reads the columns listed in `RUN_COLUMNS`.
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            run_id: row.get(0)?,
            external_id: row.get(1)?,
            workflow: row.get(2)?,
            team: row.get(3)?,
            status: row.get(4)?,
            created_at: row.get(5)?,
            started_at: row.get(6)?,
            ended_at: row.get(7)?,
            last_synced_at: row.get(8)?,
            progress: row.get(9)?,
        })
    }

    /// Decodes the status label into a domain record.
    fn into_run(self) -> Result<ExecutionRun, SqliteStoreError> {
        let status = RunStatus::parse(&self.status).ok_or_else(|| {
            SqliteStoreError::Corrupt(format!("run {}: status {}", self.run_id, self.status))
        })?;
        Ok(ExecutionRun {
            run_id: RunId::new(self.run_id),
            external_id: self.external_id.map(ExternalRunId::new),
            workflow: WorkflowName::new(self.workflow),
            team: TeamId::new(self.team),
            status,
            created_at: Timestamp::from_unix_millis(self.created_at),
            started_at: self.started_at.map(Timestamp::from_unix_millis),
            ended_at: self.ended_at.map(Timestamp::from_unix_millis),
            last_synced_at: self.last_synced_at.map(Timestamp::from_unix_millis),
            progress: self.progress,
        })
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Ensures the parent directory for the store exists.
fn ensure_parent_dir(path: &Path) -> Result<(), SqliteStoreError> {
    let Some(parent) = path.parent() else {
        return Err(SqliteStoreError::Io("store path missing parent directory".to_string()));
    };
    if parent.as_os_str().is_empty() {
        return Ok(());
    }
    std::fs::create_dir_all(parent).map_err(|err| SqliteStoreError::Io(err.to_string()))
}

/// Validates store paths for safety limits.
fn validate_store_path(path: &Path) -> Result<(), SqliteStoreError> {
    let path_string = path.display().to_string();
    if path_string.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(SqliteStoreError::Invalid("store path exceeds length limit".to_string()));
    }
    for component in path.components() {
        let name = component.as_os_str().to_string_lossy();
        if name.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(SqliteStoreError::Invalid(
                "store path contains an overlong component".to_string(),
            ));
        }
    }
    if path.is_dir() {
        return Err(SqliteStoreError::Invalid(
            "store path must be a file, not a directory".to_string(),
        ));
    }
    Ok(())
}

/// Opens an `SQLite` connection and applies pragmas.
fn open_connection(config: &SqliteStoreConfig) -> Result<Connection, SqliteStoreError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
    let connection = Connection::open_with_flags(&config.path, flags)?;
    connection.execute_batch(&format!(
        "PRAGMA journal_mode = {}; PRAGMA synchronous = {};",
        config.journal_mode.pragma_value(),
        config.sync_mode.pragma_value()
    ))?;
    connection.busy_timeout(Duration::from_millis(config.busy_timeout_ms))?;
    Ok(connection)
}

/// Initializes the `SQLite` schema or validates the existing version.
fn initialize_schema(connection: &mut Connection) -> Result<(), SqliteStoreError> {
    let tx = connection.transaction()?;
    tx.execute_batch("CREATE TABLE IF NOT EXISTS store_meta (version INTEGER NOT NULL);")?;
    let version: Option<i64> = tx
        .query_row("SELECT version FROM store_meta LIMIT 1", params![], |row| row.get(0))
        .optional()?;
    match version {
        None => {
            tx.execute("INSERT INTO store_meta (version) VALUES (?1)", params![SCHEMA_VERSION])?;
            tx.execute_batch(
                "CREATE TABLE IF NOT EXISTS workflow_definitions (
                    name TEXT PRIMARY KEY,
                    team TEXT NOT NULL,
                    description TEXT,
                    cron TEXT NOT NULL,
                    timezone TEXT NOT NULL,
                    origin TEXT NOT NULL,
                    spec_path TEXT,
                    spec_digest TEXT,
                    status TEXT NOT NULL,
                    created_at INTEGER NOT NULL,
                    updated_at INTEGER NOT NULL,
                    deleted_at INTEGER
                );
                CREATE TABLE IF NOT EXISTS execution_runs (
                    run_id TEXT PRIMARY KEY,
                    external_id TEXT UNIQUE,
                    workflow TEXT NOT NULL,
                    team TEXT NOT NULL,
                    status TEXT NOT NULL,
                    created_at INTEGER NOT NULL,
                    started_at INTEGER,
                    ended_at INTEGER,
                    last_synced_at INTEGER,
                    progress TEXT
                );
                CREATE INDEX IF NOT EXISTS idx_execution_runs_team_status
                    ON execution_runs (team, status);
                CREATE TABLE IF NOT EXISTS clusters (
                    team TEXT PRIMARY KEY,
                    endpoint TEXT NOT NULL,
                    credential_json TEXT NOT NULL,
                    active INTEGER NOT NULL
                );",
            )?;
        }
        Some(value) if value == SCHEMA_VERSION => {}
        Some(value) => {
            return Err(SqliteStoreError::VersionMismatch(format!(
                "unsupported schema version: {value}"
            )));
        }
    }
    tx.commit()?;
    Ok(())
}
