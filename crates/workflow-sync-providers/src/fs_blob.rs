// crates/workflow-sync-providers/src/fs_blob.rs
// ============================================================================
// Module: Filesystem Blob Store
// Description: Spec file source rooted at a local directory.
// Purpose: Serve spec files for development and tests without S3.
// Dependencies: workflow-sync-core
// ============================================================================

//! ## Overview
//! [`FsBlobStore`] exposes every regular file under a root directory as an
//! object whose path is the slash-joined path relative to the root. Reads
//! resolve symlinks and refuse anything that lands outside the root.
//! Symlinks are not followed while listing.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::fs::File;
use std::io;
use std::io::Read;
use std::path::Path;
use std::path::PathBuf;

use workflow_sync_core::BlobStore;
use workflow_sync_core::BlobStoreError;

use crate::paths::validate_object_path;
use crate::paths::validate_prefix;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Maximum number of files a single listing may return.
const MAX_LISTED_FILES: usize = 100_000;
/// Maximum directory depth walked below the root.
const MAX_WALK_DEPTH: usize = 32;

// ============================================================================
// SECTION: Store
// ============================================================================

/// Blob store backed by a local directory tree.
///
/// # Invariants
/// - `root` is canonical and names a directory.
/// - Reads never return content from outside `root`.
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    /// Canonical root directory.
    root: PathBuf,
    /// Maximum bytes returned for a single file.
    max_bytes: u64,
}

impl FsBlobStore {
    /// Opens a store rooted at `root`.
    ///
    /// # Errors
    ///
    /// Returns [`BlobStoreError::Invalid`] when `root` is not a directory.
    pub fn new(root: impl AsRef<Path>, max_bytes: u64) -> Result<Self, BlobStoreError> {
        let root = root.as_ref();
        let canonical = root
            .canonicalize()
            .map_err(|err| BlobStoreError::Invalid(format!("{}: {err}", root.display())))?;
        if !canonical.is_dir() {
            return Err(BlobStoreError::Invalid(format!(
                "{}: blob root must be a directory",
                root.display()
            )));
        }
        Ok(Self {
            root: canonical,
            max_bytes,
        })
    }

    /// Returns the canonical root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Walks the tree and returns every relative file path.
    fn walk(&self) -> Result<Vec<String>, BlobStoreError> {
        let mut files = Vec::new();
        let mut pending = vec![(self.root.clone(), String::new(), 0usize)];
        while let Some((dir, relative, depth)) = pending.pop() {
            let entries = fs::read_dir(&dir).map_err(|err| backend_error(&dir, &err))?;
            for entry in entries {
                let entry = entry.map_err(|err| backend_error(&dir, &err))?;
                let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                    continue;
                };
                let child = if relative.is_empty() { name } else { format!("{relative}/{name}") };
                let file_type = entry.file_type().map_err(|err| backend_error(&dir, &err))?;
                if file_type.is_dir() {
                    if depth + 1 < MAX_WALK_DEPTH {
                        pending.push((entry.path(), child, depth + 1));
                    }
                } else if file_type.is_file() {
                    if files.len() >= MAX_LISTED_FILES {
                        return Err(BlobStoreError::Backend(format!(
                            "listing exceeds {MAX_LISTED_FILES} files"
                        )));
                    }
                    files.push(child);
                }
            }
        }
        Ok(files)
    }
}

impl BlobStore for FsBlobStore {
    fn list_spec_files(&self, prefix: &str) -> Result<Vec<String>, BlobStoreError> {
        validate_prefix(prefix)?;
        let mut files: Vec<String> =
            self.walk()?.into_iter().filter(|path| path.starts_with(prefix)).collect();
        files.sort();
        Ok(files)
    }

    fn read_spec_file(&self, path: &str) -> Result<Vec<u8>, BlobStoreError> {
        validate_object_path(path)?;
        let candidate = self.root.join(path);
        let resolved = candidate.canonicalize().map_err(|err| match err.kind() {
            io::ErrorKind::NotFound => BlobStoreError::NotFound(path.to_string()),
            _ => backend_error(&candidate, &err),
        })?;
        if !resolved.starts_with(&self.root) {
            return Err(BlobStoreError::Invalid(format!("{path}: resolves outside blob root")));
        }
        let metadata = fs::metadata(&resolved).map_err(|err| backend_error(&resolved, &err))?;
        if !metadata.is_file() {
            return Err(BlobStoreError::NotFound(path.to_string()));
        }
        if metadata.len() > self.max_bytes {
            return Err(self.too_large(path));
        }
        let file = File::open(&resolved).map_err(|err| backend_error(&resolved, &err))?;
        let mut bytes = Vec::new();
        file.take(self.max_bytes.saturating_add(1))
            .read_to_end(&mut bytes)
            .map_err(|err| backend_error(&resolved, &err))?;
        if u64::try_from(bytes.len()).unwrap_or(u64::MAX) > self.max_bytes {
            return Err(self.too_large(path));
        }
        Ok(bytes)
    }
}

impl FsBlobStore {
    /// Builds the size limit error for `path`.
    fn too_large(&self, path: &str) -> BlobStoreError {
        BlobStoreError::TooLarge {
            path: path.to_string(),
            limit: self.max_bytes,
        }
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Maps an I/O failure to a backend error naming the path.
fn backend_error(path: &Path, err: &io::Error) -> BlobStoreError {
    BlobStoreError::Backend(format!("{}: {err}", path.display()))
}
