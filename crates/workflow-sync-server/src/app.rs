// crates/workflow-sync-server/src/app.rs
// ============================================================================
// Module: Server Assembly
// Description: Builds stores, providers, engines, and the service from config.
// Purpose: Turn a validated workflow-sync.toml into a running process.
// Dependencies: workflow-sync-config, workflow-sync-providers, workflow-sync-store-sqlite
// ============================================================================

//! ## Overview
//! [`WorkflowSyncServer::from_config`] wires every port to its configured
//! backend. With the `sqlite` store the configured clusters are upserted into
//! the database at startup and the database becomes the cluster registry;
//! with the `memory` store the configured clusters are used as-is.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::sync::Arc;

use thiserror::Error;
use workflow_sync_config::AuditConfig;
use workflow_sync_config::AuditSinkKind;
use workflow_sync_config::BlobStoreConfig;
use workflow_sync_config::OrchestratorSettings;
use workflow_sync_config::StoreType;
use workflow_sync_config::WorkflowSyncConfig;
use workflow_sync_core::BlobStore;
use workflow_sync_core::Clock;
use workflow_sync_core::ClusterRegistry;
use workflow_sync_core::InMemoryRunStore;
use workflow_sync_core::InMemoryWorkflowRegistry;
use workflow_sync_core::OrchestratorConnector;
use workflow_sync_core::RunReconciler;
use workflow_sync_core::RunStore;
use workflow_sync_core::SpecSyncEngine;
use workflow_sync_core::StaticClusterRegistry;
use workflow_sync_core::WorkflowControl;
use workflow_sync_core::WorkflowRegistry;
use workflow_sync_providers::FsBlobStore;
use workflow_sync_providers::HttpOrchestratorConfig;
use workflow_sync_providers::HttpOrchestratorConnector;
use workflow_sync_providers::S3BlobStore;
use workflow_sync_providers::S3BlobStoreOptions;
use workflow_sync_store_sqlite::SqliteWorkflowStore;

use crate::audit::AuditObserver;
use crate::audit::FileAuditSink;
use crate::audit::NoopAuditSink;
use crate::audit::StderrAuditSink;
use crate::audit::SyncAuditSink;
use crate::clock::SystemClock;
use crate::http::admin_router;
use crate::scheduler::ScheduleIntervals;
use crate::scheduler::spawn_schedulers;
use crate::service::SyncService;
use crate::service::SyncServiceParts;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Server startup and runtime failures.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Configuration is invalid.
    #[error("config error: {0}")]
    Config(String),
    /// A backend could not be initialized.
    #[error("init error: {0}")]
    Init(String),
    /// The admin listener failed.
    #[error("transport error: {0}")]
    Transport(String),
}

// ============================================================================
// SECTION: Server
// ============================================================================

/// Fully wired workflow sync process.
pub struct WorkflowSyncServer {
    /// Validated configuration.
    config: WorkflowSyncConfig,
    /// Guarded sync and control service.
    service: Arc<SyncService>,
}

impl WorkflowSyncServer {
    /// Builds every backend named by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError`] when validation fails or a backend cannot start.
    pub fn from_config(config: WorkflowSyncConfig) -> Result<Self, ServerError> {
        config.validate().map_err(|err| ServerError::Config(err.to_string()))?;
        let backends = build_backends(&config)?;
        let audit = build_audit_sink(&config.audit)?;
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let connector: Arc<dyn OrchestratorConnector> =
            Arc::new(HttpOrchestratorConnector::new(orchestrator_config(&config.orchestrator)));

        let spec_engine = if config.spec_sync.enabled {
            let blobs = build_blob_store(&config)?;
            Some(SpecSyncEngine::new(
                blobs,
                Arc::clone(&backends.registry),
                Arc::clone(&clock),
                config.spec_sync.engine_config(),
            ))
        } else {
            None
        };
        let reconciler = config.run_sync.enabled.then(|| {
            RunReconciler::new(
                Arc::clone(&backends.clusters),
                Arc::clone(&connector),
                Arc::clone(&backends.runs),
                Arc::clone(&backends.registry),
                Arc::clone(&clock),
                Arc::new(AuditObserver::new(Arc::clone(&audit))),
                config.run_sync.engine_config(),
            )
        });
        let control = WorkflowControl::new(
            backends.registry,
            backends.runs,
            backends.clusters,
            connector,
            clock,
        );
        let service = Arc::new(SyncService::new(SyncServiceParts {
            spec_engine,
            reconciler,
            control,
            audit,
        }));
        Ok(Self {
            config,
            service,
        })
    }

    /// Returns the sync service.
    #[must_use]
    pub const fn service(&self) -> &Arc<SyncService> {
        &self.service
    }

    /// Starts the timers and serves the admin API until the listener fails.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError`] when binding or serving fails.
    pub async fn serve(self) -> Result<(), ServerError> {
        let addr =
            self.config.server.bind_addr().map_err(|err| ServerError::Config(err.to_string()))?;
        let intervals = ScheduleIntervals {
            specs: self.config.spec_sync.enabled.then_some(self.config.spec_sync.interval()),
            runs: self.config.run_sync.enabled.then_some(self.config.run_sync.interval()),
        };
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|err| ServerError::Transport(format!("bind {addr}: {err}")))?;
        let timers = spawn_schedulers(&self.service, intervals);
        let result = axum::serve(listener, admin_router(Arc::clone(&self.service)))
            .await
            .map_err(|err| ServerError::Transport(err.to_string()));
        for timer in timers {
            timer.abort();
        }
        result
    }
}

// ============================================================================
// SECTION: Builders
// ============================================================================

/// Local persistence ports.
struct Backends {
    /// Definition registry.
    registry: Arc<dyn WorkflowRegistry>,
    /// Run history.
    runs: Arc<dyn RunStore>,
    /// Cluster lookup.
    clusters: Arc<dyn ClusterRegistry>,
}

/// Builds the local stores for the configured backend.
fn build_backends(config: &WorkflowSyncConfig) -> Result<Backends, ServerError> {
    match config.store.store_type {
        StoreType::Memory => Ok(Backends {
            registry: Arc::new(InMemoryWorkflowRegistry::new()),
            runs: Arc::new(InMemoryRunStore::new()),
            clusters: Arc::new(StaticClusterRegistry::new(config.clusters.clone())),
        }),
        StoreType::Sqlite => {
            let sqlite_config = config.store.sqlite_config().ok_or_else(|| {
                ServerError::Config("sqlite store requires path".to_string())
            })?;
            let store = SqliteWorkflowStore::new(&sqlite_config)
                .map_err(|err| ServerError::Init(err.to_string()))?;
            for cluster in &config.clusters {
                store.upsert_cluster(cluster).map_err(|err| ServerError::Init(err.to_string()))?;
            }
            let store = Arc::new(store);
            Ok(Backends {
                registry: Arc::clone(&store) as Arc<dyn WorkflowRegistry>,
                runs: Arc::clone(&store) as Arc<dyn RunStore>,
                clusters: store,
            })
        }
    }
}

/// Builds the spec file source.
fn build_blob_store(config: &WorkflowSyncConfig) -> Result<Arc<dyn BlobStore>, ServerError> {
    let max_bytes = config.spec_sync.max_spec_bytes;
    match &config.blob_store {
        None => Err(ServerError::Config("spec_sync requires a [blob_store] section".to_string())),
        Some(BlobStoreConfig::Filesystem(fs)) => {
            let store = FsBlobStore::new(&fs.root, max_bytes)
                .map_err(|err| ServerError::Init(err.to_string()))?;
            Ok(Arc::new(store))
        }
        Some(BlobStoreConfig::S3(s3)) => {
            let options = S3BlobStoreOptions {
                bucket: s3.bucket.clone(),
                region: s3.region.clone(),
                endpoint: s3.endpoint.clone(),
                force_path_style: s3.force_path_style,
                timeout_ms: s3.timeout_ms,
                max_bytes,
            };
            let store =
                S3BlobStore::new(&options).map_err(|err| ServerError::Init(err.to_string()))?;
            Ok(Arc::new(store))
        }
    }
}

/// Builds the audit sink.
fn build_audit_sink(config: &AuditConfig) -> Result<Arc<dyn SyncAuditSink>, ServerError> {
    match config.sink {
        AuditSinkKind::Stderr => Ok(Arc::new(StderrAuditSink)),
        AuditSinkKind::None => Ok(Arc::new(NoopAuditSink)),
        AuditSinkKind::File => {
            let path = config.path.as_deref().ok_or_else(|| {
                ServerError::Config("audit sink `file` requires path".to_string())
            })?;
            let sink = FileAuditSink::new(Path::new(path))
                .map_err(|err| ServerError::Init(format!("audit log {path}: {err}")))?;
            Ok(Arc::new(sink))
        }
    }
}

/// Converts orchestrator settings into client settings.
fn orchestrator_config(settings: &OrchestratorSettings) -> HttpOrchestratorConfig {
    HttpOrchestratorConfig {
        connect_timeout_ms: settings.connect_timeout_ms,
        request_timeout_ms: settings.request_timeout_ms,
        user_agent: settings.user_agent.clone(),
        allow_http: settings.allow_http,
        max_response_bytes: settings.max_response_bytes,
        retry: settings.retry,
    }
}
