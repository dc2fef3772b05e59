// crates/workflow-sync-core/src/core/cluster.rs
// ============================================================================
// Module: Cluster Configuration
// Description: Orchestrator endpoint and credential per owning team.
// Purpose: Describe how the platform reaches one team's orchestrator cluster.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! A [`ClusterConfig`] binds a team to an orchestrator base endpoint and a
//! credential. Credentials are redacted from `Debug` output so configs can be
//! logged safely.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::TeamId;

// ============================================================================
// SECTION: Credential
// ============================================================================

/// Credential used to authenticate against an orchestrator API.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClusterCredential {
    /// No authentication.
    #[default]
    None,
    /// Bearer token authentication.
    Bearer {
        /// Token value.
        token: String,
    },
    /// HTTP basic authentication.
    Basic {
        /// Username.
        username: String,
        /// Password.
        password: String,
    },
}

impl ClusterCredential {
    /// Returns the credential kind label.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Bearer {
                ..
            } => "bearer",
            Self::Basic {
                ..
            } => "basic",
        }
    }
}

impl fmt::Debug for ClusterCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Bearer {
                ..
            } => f.write_str("Bearer { token: <redacted> }"),
            Self::Basic {
                username,
                ..
            } => write!(f, "Basic {{ username: {username:?}, password: <redacted> }}"),
        }
    }
}

// ============================================================================
// SECTION: Cluster Config
// ============================================================================

/// Orchestrator cluster assigned to one team.
///
/// # Invariants
/// - At most one active cluster exists per team within a deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterConfig {
    /// Owning team (unique within the deployment).
    pub team: TeamId,
    /// Orchestrator base endpoint (scheme + host + optional path prefix).
    pub endpoint: String,
    /// Credential for the orchestrator API.
    #[serde(default)]
    pub credential: ClusterCredential,
    /// Whether the cluster participates in reconciliation.
    #[serde(default = "default_active")]
    pub active: bool,
}

/// Clusters are active unless stated otherwise.
const fn default_active() -> bool {
    true
}

// ============================================================================
// SECTION: Tests
// ============================================================================
