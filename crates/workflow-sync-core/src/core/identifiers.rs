// crates/workflow-sync-core/src/core/identifiers.rs
// ============================================================================
// Module: Workflow Sync Identifiers
// Description: Opaque identifiers for workflows, teams, and runs.
// Purpose: Provide strongly typed, serializable IDs with stable string forms.
// Dependencies: serde, rand
// ============================================================================

//! ## Overview
//! Identifiers are opaque strings that serialize transparently. Validation of
//! workflow names happens when spec files are parsed; the wrappers here only
//! keep the different key spaces from being mixed up.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Identifier Macro
// ============================================================================

/// Declares a transparent string identifier with the shared helper impls.
macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Returns the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self::new(value)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self::new(value)
            }
        }
    };
}

// ============================================================================
// SECTION: Identifier Types
// ============================================================================

string_id!(
    /// Globally unique workflow (dataset) name; the registry key.
    WorkflowName
);

string_id!(
    /// Owning team identifier; also the cluster key within a deployment.
    TeamId
);

string_id!(
    /// Platform-generated local run identifier.
    RunId
);

string_id!(
    /// Run identifier assigned by an external orchestrator.
    ExternalRunId
);

impl RunId {
    /// Generates a fresh run identifier.
    ///
    /// The identifier embeds the creation time so ids sort roughly by age,
    /// followed by 64 random bits.
    #[must_use]
    pub fn generate(created_at_millis: i64) -> Self {
        let entropy: u64 = rand::random();
        Self(format!("run-{created_at_millis:013}-{entropy:016x}"))
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
