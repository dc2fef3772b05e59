// crates/workflow-sync-core/src/runtime/mod.rs
// ============================================================================
// Module: Workflow Sync Runtime
// Description: Sync engines, workflow control, and in-memory ports.
// Purpose: Execute reconciliation passes against the interface ports.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! Runtime modules implement spec sync, run reconciliation, and workflow
//! control. Every host surface (scheduler, admin API, CLI) calls into the
//! same engine functions.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod control;
pub mod run_sync;
pub mod spec_sync;
pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use control::ControlError;
pub use control::RegisterRequest;
pub use control::WorkflowControl;
pub use run_sync::RunReconciler;
pub use run_sync::RunSyncConfig;
pub use spec_sync::SpecSyncConfig;
pub use spec_sync::SpecSyncEngine;
pub use store::InMemoryRunStore;
pub use store::InMemoryWorkflowRegistry;
pub use store::ManualClock;
pub use store::StaticClusterRegistry;
