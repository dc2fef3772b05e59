// crates/workflow-sync-store-sqlite/src/lib.rs
// ============================================================================
// Module: SQLite Workflow Store
// Description: Durable registry and run history backend using SQLite WAL.
// Purpose: Provide production persistence for workflow sync.
// Dependencies: workflow-sync-core, rusqlite
// ============================================================================

//! ## Overview
//! This crate provides a single SQLite-backed store implementing the
//! [`workflow_sync_core::WorkflowRegistry`], [`workflow_sync_core::RunStore`],
//! and [`workflow_sync_core::ClusterRegistry`] ports. Uniqueness of external
//! run ids is enforced by the schema.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use store::SqliteStoreConfig;
pub use store::SqliteStoreError;
pub use store::SqliteStoreMode;
pub use store::SqliteSyncMode;
pub use store::SqliteWorkflowStore;
