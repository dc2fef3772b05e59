// crates/workflow-sync-core/src/core/mod.rs
// ============================================================================
// Module: Workflow Sync Core Types
// Description: Canonical model for definitions, runs, clusters, and outcomes.
// Purpose: Provide stable, serializable types shared by every host surface.
// Dependencies: serde, time
// ============================================================================

//! ## Overview
//! Core types describe the local registry of workflow definitions, local run
//! history, orchestrator cluster bindings, and sync outcomes. Everything a
//! host (HTTP, CLI, scheduler) reports is expressed in these types.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod cluster;
pub mod definition;
pub mod identifiers;
pub mod outcome;
pub mod retry;
pub mod run;
pub mod spec;
pub mod time;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use cluster::ClusterConfig;
pub use cluster::ClusterCredential;
pub use definition::DefinitionOrigin;
pub use definition::DefinitionStatus;
pub use definition::Schedule;
pub use definition::WorkflowDefinition;
pub use identifiers::ExternalRunId;
pub use identifiers::RunId;
pub use identifiers::TeamId;
pub use identifiers::WorkflowName;
pub use outcome::AggregateSyncOutcome;
pub use outcome::ClusterSyncOutcome;
pub use outcome::ItemError;
pub use outcome::SyncOutcome;
pub use retry::RetryPolicy;
pub use run::ExecutionRun;
pub use run::ExternalRun;
pub use run::ExternalRunState;
pub use run::RunStatus;
pub use run::next_status;
pub use spec::SpecDescriptor;
pub use spec::SpecParseError;
pub use spec::parse_spec;
pub use time::Timestamp;
pub use time::TimestampParseError;
