// crates/workflow-sync-providers/src/paths.rs
// ============================================================================
// Module: Blob Path Validation
// Description: Shared checks for spec file paths and listing prefixes.
// Purpose: Keep blob access inside the configured namespace.
// Dependencies: workflow-sync-core
// ============================================================================

//! ## Overview
//! Spec paths are slash-separated, relative, and free of traversal segments
//! for every blob backend. Prefixes follow S3 semantics: a raw string match
//! on the object path, so `metrics/` and `metrics/da` are both valid.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Component;
use std::path::Path;

use workflow_sync_core::BlobStoreError;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Maximum length of a single path segment.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;

// ============================================================================
// SECTION: Validation
// ============================================================================

/// Validates a spec path relative to the blob root.
pub(crate) fn validate_object_path(path: &str) -> Result<(), BlobStoreError> {
    if path.is_empty() {
        return Err(BlobStoreError::Invalid("path must be set".to_string()));
    }
    if path.contains('\\') {
        return Err(BlobStoreError::Invalid(format!("{path}: backslashes are not allowed")));
    }
    if path.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(BlobStoreError::Invalid(format!("{path}: path exceeds length limit")));
    }
    if path.starts_with('/') {
        return Err(BlobStoreError::Invalid(format!("{path}: path must be relative")));
    }
    for segment in path.split('/') {
        if segment.is_empty() || segment == "." || segment == ".." {
            return Err(BlobStoreError::Invalid(format!("{path}: invalid path segment")));
        }
        if segment.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(BlobStoreError::Invalid(format!("{path}: segment exceeds length limit")));
        }
    }
    Ok(())
}

/// Validates a listing prefix. The empty prefix lists everything.
pub(crate) fn validate_prefix(prefix: &str) -> Result<(), BlobStoreError> {
    if prefix.is_empty() {
        return Ok(());
    }
    if prefix.contains('\\') || prefix.starts_with('/') {
        return Err(BlobStoreError::Invalid(format!("{prefix}: prefix must be relative")));
    }
    if prefix.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(BlobStoreError::Invalid(format!("{prefix}: prefix exceeds length limit")));
    }
    let traverses = Path::new(prefix)
        .components()
        .any(|component| !matches!(component, Component::Normal(_)));
    if traverses {
        return Err(BlobStoreError::Invalid(format!("{prefix}: prefix must not traverse")));
    }
    Ok(())
}

// ============================================================================
// SECTION: Tests
// ============================================================================
