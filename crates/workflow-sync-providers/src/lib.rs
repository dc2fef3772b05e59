// crates/workflow-sync-providers/src/lib.rs
// ============================================================================
// Module: Workflow Sync Providers
// Description: Concrete blob stores and orchestrator clients.
// Purpose: Back the core ports with S3, local files, and HTTP.
// Dependencies: workflow-sync-core, aws-sdk-s3, reqwest
// ============================================================================

//! ## Overview
//! Adapters that implement the [`workflow_sync_core::BlobStore`] and
//! [`workflow_sync_core::OrchestratorConnector`] ports. Every adapter bounds
//! its external calls with timeouts and size limits and reports failures as
//! port errors.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod fs_blob;
pub mod orchestrator;
mod paths;
pub mod s3_blob;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use fs_blob::FsBlobStore;
pub use orchestrator::HttpOrchestratorClient;
pub use orchestrator::HttpOrchestratorConfig;
pub use orchestrator::HttpOrchestratorConnector;
pub use s3_blob::S3BlobStore;
pub use s3_blob::S3BlobStoreOptions;
