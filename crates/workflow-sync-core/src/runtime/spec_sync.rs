// crates/workflow-sync-core/src/runtime/spec_sync.rs
// ============================================================================
// Module: Spec Sync Engine
// Description: Reconciles blob-stored spec files into the workflow registry.
// Purpose: Keep CODE-origin definitions identical to their spec files.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! One pass lists spec files under the configured prefix, parses each one,
//! and overwrites the registry entry with the same name. Spec content always
//! wins over manual registrations. Failures are isolated per file and the
//! pass always returns a [`SyncOutcome`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::core::DefinitionOrigin;
use crate::core::SyncOutcome;
use crate::core::Timestamp;
use crate::core::WorkflowDefinition;
use crate::core::parse_spec;
use crate::interfaces::BlobStore;
use crate::interfaces::Clock;
use crate::interfaces::WorkflowRegistry;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Spec sync settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecSyncConfig {
    /// Blob prefix to list.
    pub prefix: String,
    /// Accepted file extensions, including the leading dot.
    pub extensions: Vec<String>,
}

impl Default for SpecSyncConfig {
    fn default() -> Self {
        Self {
            prefix: String::new(),
            extensions: vec![".yaml".to_string()],
        }
    }
}

impl SpecSyncConfig {
    /// Returns true when `path` carries an accepted extension.
    #[must_use]
    pub fn accepts(&self, path: &str) -> bool {
        self.extensions.iter().any(|extension| path.ends_with(extension.as_str()))
    }
}

// ============================================================================
// SECTION: Engine
// ============================================================================

/// Effect of syncing one spec file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SpecChange {
    /// New definition written.
    Created,
    /// Existing definition overwritten.
    Updated,
    /// Existing definition already matched.
    Unchanged,
}

/// Pull-and-upsert engine for workflow definitions.
#[derive(Clone)]
pub struct SpecSyncEngine {
    /// Spec file source.
    blobs: Arc<dyn BlobStore>,
    /// Definition registry.
    registry: Arc<dyn WorkflowRegistry>,
    /// Time source.
    clock: Arc<dyn Clock>,
    /// Settings.
    config: SpecSyncConfig,
}

impl SpecSyncEngine {
    /// Creates an engine over the given ports.
    #[must_use]
    pub fn new(
        blobs: Arc<dyn BlobStore>,
        registry: Arc<dyn WorkflowRegistry>,
        clock: Arc<dyn Clock>,
        config: SpecSyncConfig,
    ) -> Self {
        Self {
            blobs,
            registry,
            clock,
            config,
        }
    }

    /// Returns the engine settings.
    #[must_use]
    pub const fn config(&self) -> &SpecSyncConfig {
        &self.config
    }

    /// Runs one sync pass. Never fails; errors are recorded in the outcome.
    #[must_use]
    pub fn sync_specs(&self) -> SyncOutcome {
        let now = self.clock.now();
        let mut outcome = SyncOutcome::start(now);
        let mut paths = match self.blobs.list_spec_files(&self.config.prefix) {
            Ok(paths) => paths,
            Err(err) => {
                outcome.record_pass_error(self.config.prefix.clone(), err.to_string());
                return outcome.finish(self.clock.now());
            }
        };
        paths.retain(|path| self.config.accepts(path));
        paths.sort();
        paths.dedup();

        let mut claimed: BTreeMap<String, String> = BTreeMap::new();
        for path in paths {
            outcome.processed += 1;
            match self.sync_one(&path, now, &mut claimed) {
                Ok(SpecChange::Created) => outcome.created += 1,
                Ok(SpecChange::Updated) => outcome.updated += 1,
                Ok(SpecChange::Unchanged) => outcome.unchanged += 1,
                Err(message) => outcome.record_failure(path, message),
            }
        }
        outcome.finish(self.clock.now())
    }

    /// Syncs one spec file, returning a message on failure.
    fn sync_one(
        &self,
        path: &str,
        now: Timestamp,
        claimed: &mut BTreeMap<String, String>,
    ) -> Result<SpecChange, String> {
        let content = self.blobs.read_spec_file(path).map_err(|err| err.to_string())?;
        let spec = parse_spec(&content).map_err(|err| err.to_string())?;
        if let Some(owner) = claimed.get(spec.name.as_str()) {
            return Err(format!("workflow {} is already defined by {owner}", spec.name));
        }
        claimed.insert(spec.name.as_str().to_string(), path.to_string());

        let existing = self.registry.get(&spec.name).map_err(|err| err.to_string())?;
        let created_at = existing.as_ref().map_or(now, |current| current.created_at);
        let desired = WorkflowDefinition {
            name: spec.name,
            team: spec.team,
            description: spec.description,
            schedule: spec.schedule,
            origin: DefinitionOrigin::Code,
            spec_path: Some(path.to_string()),
            spec_digest: Some(spec.digest),
            status: spec.status,
            created_at,
            updated_at: now,
            deleted_at: None,
        };
        let change = match &existing {
            Some(current) if current.same_content(&desired) => return Ok(SpecChange::Unchanged),
            Some(_) => SpecChange::Updated,
            None => SpecChange::Created,
        };
        self.registry.upsert(&desired).map_err(|err| err.to_string())?;
        Ok(change)
    }
}
