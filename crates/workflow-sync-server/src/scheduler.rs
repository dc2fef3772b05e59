// crates/workflow-sync-server/src/scheduler.rs
// ============================================================================
// Module: Sync Scheduler
// Description: Periodic timers driving spec and run sync passes.
// Purpose: Run each enabled sync kind on its own interval.
// Dependencies: tokio
// ============================================================================

//! ## Overview
//! Each enabled sync kind gets one tokio task that ticks on its interval and
//! runs the pass on the blocking pool. A tick that finds the previous pass
//! (or a manual one) still running is skipped; missed ticks are not queued.
//! A pass that panics is audited as `sync_aborted` and the timer keeps going.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::guard::SyncKind;
use crate::guard::SyncTrigger;
use crate::service::SyncService;

// ============================================================================
// SECTION: Scheduler
// ============================================================================

/// Intervals for the periodic passes; `None` disables the timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScheduleIntervals {
    /// Spec sync interval.
    pub specs: Option<Duration>,
    /// Run sync interval.
    pub runs: Option<Duration>,
}

/// Spawns one timer task per enabled sync kind.
///
/// Must be called from within a tokio runtime.
#[must_use]
pub fn spawn_schedulers(
    service: &Arc<SyncService>,
    intervals: ScheduleIntervals,
) -> Vec<JoinHandle<()>> {
    let timers = [(SyncKind::Specs, intervals.specs), (SyncKind::Runs, intervals.runs)];
    timers
        .into_iter()
        .filter_map(|(kind, period)| {
            let period = period.filter(|period| !period.is_zero())?;
            if !service.is_enabled(kind) {
                return None;
            }
            Some(tokio::spawn(run_timer(Arc::clone(service), kind, period)))
        })
        .collect()
}

/// Ticks forever, running one pass of `kind` per tick.
async fn run_timer(service: Arc<SyncService>, kind: SyncKind, period: Duration) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    loop {
        interval.tick().await;
        let pass = Arc::clone(&service);
        // Skipped ticks and completed passes are audited by the service.
        if let Err(err) = tokio::task::spawn_blocking(move || run_tick(&pass, kind)).await {
            service.record_aborted(kind, SyncTrigger::Timer, &err.to_string());
        }
    }
}

/// Runs one timer-triggered pass.
fn run_tick(service: &SyncService, kind: SyncKind) {
    match kind {
        SyncKind::Specs => {
            let _ = service.trigger_spec_sync(SyncTrigger::Timer);
        }
        SyncKind::Runs => {
            let _ = service.trigger_run_sync(SyncTrigger::Timer);
        }
    }
}
