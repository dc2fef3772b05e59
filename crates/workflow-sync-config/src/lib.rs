// crates/workflow-sync-config/src/lib.rs
// ============================================================================
// Module: Workflow Sync Config Library
// Description: Canonical config model and validation.
// Purpose: Single source of truth for workflow-sync.toml semantics.
// Dependencies: workflow-sync-core, workflow-sync-store-sqlite, serde, toml
// ============================================================================

//! ## Overview
//! `workflow-sync-config` defines the configuration model for the sync
//! service and CLI. Validation is strict and fails closed; configuration is
//! read once at process start.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::AuditConfig;
pub use config::AuditSinkKind;
pub use config::BlobStoreConfig;
pub use config::ConfigError;
pub use config::FilesystemBlobStoreConfig;
pub use config::OrchestratorSettings;
pub use config::RunSyncSettings;
pub use config::S3BlobStoreConfig;
pub use config::ServerConfig;
pub use config::SpecSyncSettings;
pub use config::StoreConfig;
pub use config::StoreType;
pub use config::WorkflowSyncConfig;
