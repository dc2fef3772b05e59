// crates/workflow-sync-server/src/guard.rs
// ============================================================================
// Module: Single-Flight Guards
// Description: One-at-a-time tokens for each sync type.
// Purpose: Keep passes of the same kind from overlapping.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! A [`SyncGuard`] hands out at most one [`SyncLease`] at a time. The lease
//! releases the guard when dropped, including on unwind.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

use serde::Serialize;

// ============================================================================
// SECTION: Labels
// ============================================================================

/// Sync pass kinds, one guard each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncKind {
    /// Spec file to definition sync.
    Specs,
    /// Orchestrator to run history reconciliation.
    Runs,
}

impl SyncKind {
    /// Returns the label used in messages.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Specs => "specs",
            Self::Runs => "runs",
        }
    }
}

impl fmt::Display for SyncKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What started a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncTrigger {
    /// Periodic scheduler tick.
    Timer,
    /// Explicit request through the API or CLI.
    Manual,
}

// ============================================================================
// SECTION: Guard
// ============================================================================

/// Single-flight token for one sync kind.
#[derive(Debug, Default)]
pub struct SyncGuard {
    /// Set while a lease is outstanding.
    running: AtomicBool,
}

impl SyncGuard {
    /// Creates an idle guard.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            running: AtomicBool::new(false),
        }
    }

    /// Takes the lease, or returns `None` while another holder has it.
    #[must_use]
    pub fn try_acquire(&self) -> Option<SyncLease<'_>> {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| SyncLease {
                guard: self,
            })
    }

    /// Returns true while a lease is outstanding.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}

/// Exclusive right to run one pass; released on drop.
#[derive(Debug)]
pub struct SyncLease<'a> {
    /// Guard released on drop.
    guard: &'a SyncGuard,
}

impl Drop for SyncLease<'_> {
    fn drop(&mut self) {
        self.guard.running.store(false, Ordering::Release);
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
