// src/engine/scheduler.rs

//! Poll scheduler: one interval timer, at most one cycle in flight.
//!
//! Each tick tries to take the engine's in-flight flag. If a cycle is still
//! running the tick does nothing; otherwise a new cycle is spawned and the
//! timer keeps ticking independently of how long the cycle takes.

use std::sync::atomic::Ordering;
use std::sync::{Arc, Weak};

use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info};

use super::EngineInner;
use super::runtime::{CycleGuard, run_cycle};

/// Spawn the polling loop for `inner`.
///
/// The loop keeps only a weak reference so that dropping the engine ends it.
pub(crate) fn spawn_scheduler(inner: &Arc<EngineInner>) -> JoinHandle<()> {
    let weak = Arc::downgrade(inner);
    let period = inner.options.poll_interval;
    info!(interval_ms = period.as_millis() as u64, "poll scheduler started");

    tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            if !on_tick(&weak) {
                break;
            }
        }
        debug!("poll scheduler stopped");
    })
}

/// Handle one tick. Returns false once the engine is gone.
fn on_tick(weak: &Weak<EngineInner>) -> bool {
    let Some(inner) = weak.upgrade() else {
        return false;
    };
    match CycleGuard::try_acquire(&inner) {
        Some(guard) => {
            tokio::spawn(run_cycle(guard));
        }
        None => {
            inner.stats.skipped_ticks.fetch_add(1, Ordering::Relaxed);
            debug!("cycle still in flight; tick skipped");
        }
    }
    true
}
