// crates/workflow-sync-core/src/core/definition.rs
// ============================================================================
// Module: Workflow Definitions
// Description: Registry records for workflow definitions and their schedules.
// Purpose: Model origin precedence and lifecycle status for registry entries.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! A [`WorkflowDefinition`] is keyed by its globally unique name. Definitions
//! originate either from spec files (`CODE`) or explicit registration
//! (`MANUAL`); `CODE` always wins. Definitions are soft-deleted only.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::TeamId;
use crate::core::identifiers::WorkflowName;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Enumerations
// ============================================================================

/// Where a workflow definition came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DefinitionOrigin {
    /// Defined by a source-controlled spec file.
    Code,
    /// Registered through the API or CLI.
    Manual,
}

impl DefinitionOrigin {
    /// Returns the stable storage label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Code => "CODE",
            Self::Manual => "MANUAL",
        }
    }

    /// Parses a storage label.
    #[must_use]
    pub fn parse(label: &str) -> Option<Self> {
        match label {
            "CODE" => Some(Self::Code),
            "MANUAL" => Some(Self::Manual),
            _ => None,
        }
    }
}

/// Lifecycle status of a workflow definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DefinitionStatus {
    /// Scheduled and runnable.
    #[default]
    Active,
    /// Schedule suspended; may be resumed.
    Paused,
    /// Not runnable (also set on unregister).
    Disabled,
}

impl DefinitionStatus {
    /// Returns the stable storage label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Paused => "PAUSED",
            Self::Disabled => "DISABLED",
        }
    }

    /// Parses a storage label.
    #[must_use]
    pub fn parse(label: &str) -> Option<Self> {
        match label {
            "ACTIVE" => Some(Self::Active),
            "PAUSED" => Some(Self::Paused),
            "DISABLED" => Some(Self::Disabled),
            _ => None,
        }
    }
}

// ============================================================================
// SECTION: Schedule
// ============================================================================

/// Cron schedule with its evaluation timezone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    /// Cron expression as written in the spec file.
    pub cron: String,
    /// IANA timezone name.
    pub timezone: String,
}

// ============================================================================
// SECTION: Workflow Definition
// ============================================================================

/// Registry record for one logical workflow.
///
/// # Invariants
/// - At most one record exists per `name`.
/// - `deleted_at` is set only by unregister; records are never removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    /// Unique workflow name.
    pub name: WorkflowName,
    /// Owning team.
    pub team: TeamId,
    /// Optional human description.
    pub description: Option<String>,
    /// Cron schedule.
    pub schedule: Schedule,
    /// Definition origin.
    pub origin: DefinitionOrigin,
    /// Blob path of the backing spec file (`CODE` origin only).
    pub spec_path: Option<String>,
    /// SHA-256 hex digest of the backing spec content.
    pub spec_digest: Option<String>,
    /// Lifecycle status.
    pub status: DefinitionStatus,
    /// Creation time.
    pub created_at: Timestamp,
    /// Last modification time.
    pub updated_at: Timestamp,
    /// Soft-delete marker.
    pub deleted_at: Option<Timestamp>,
}

impl WorkflowDefinition {
    /// Returns true when the definition has not been unregistered.
    #[must_use]
    pub const fn is_live(&self) -> bool {
        self.deleted_at.is_none()
    }

    /// Returns true when every synced field matches `other`.
    ///
    /// Timestamps other than the soft-delete marker are ignored.
    #[must_use]
    pub fn same_content(&self, other: &Self) -> bool {
        self.name == other.name
            && self.team == other.team
            && self.description == other.description
            && self.schedule == other.schedule
            && self.origin == other.origin
            && self.spec_path == other.spec_path
            && self.spec_digest == other.spec_digest
            && self.status == other.status
            && self.deleted_at == other.deleted_at
    }
}
