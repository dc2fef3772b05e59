// crates/workflow-sync-server/src/clock.rs
// ============================================================================
// Module: System Clock
// Description: Wall-clock implementation of the core clock port.
// Purpose: Supply real time to engines hosted by the server.
// Dependencies: workflow-sync-core
// ============================================================================

//! ## Overview
//! Engines never read the wall clock themselves; the host injects
//! [`SystemClock`].

use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use workflow_sync_core::Clock;
use workflow_sync_core::Timestamp;

/// Clock backed by [`SystemTime`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        let millis = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis();
        Timestamp::from_unix_millis(i64::try_from(millis).unwrap_or(i64::MAX))
    }
}
