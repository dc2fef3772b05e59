// crates/workflow-sync-core/src/lib.rs
// ============================================================================
// Module: Workflow Sync Core Library
// Description: Public API surface for the workflow state reconciliation engine.
// Purpose: Expose core types, interfaces, and sync engines.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! Workflow sync keeps a local registry of workflow definitions consistent
//! with spec files in blob storage, and local run history consistent with
//! one orchestrator cluster per team. The core is backend-agnostic: blob
//! stores, orchestrators, persistence, and the wall clock are all supplied
//! through the ports in [`interfaces`].

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use core::*;

pub use interfaces::BlobStore;
pub use interfaces::BlobStoreError;
pub use interfaces::Clock;
pub use interfaces::ClusterRegistry;
pub use interfaces::NoopSyncObserver;
pub use interfaces::OrchestratorClient;
pub use interfaces::OrchestratorConnector;
pub use interfaces::OrchestratorError;
pub use interfaces::RegistryError;
pub use interfaces::RunStore;
pub use interfaces::StoreError;
pub use interfaces::SyncEvent;
pub use interfaces::SyncObserver;
pub use interfaces::WorkflowRegistry;
pub use runtime::ControlError;
pub use runtime::InMemoryRunStore;
pub use runtime::InMemoryWorkflowRegistry;
pub use runtime::ManualClock;
pub use runtime::RegisterRequest;
pub use runtime::RunReconciler;
pub use runtime::RunSyncConfig;
pub use runtime::SpecSyncConfig;
pub use runtime::SpecSyncEngine;
pub use runtime::StaticClusterRegistry;
pub use runtime::WorkflowControl;
