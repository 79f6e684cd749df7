// src/engine/runtime.rs

//! One poll cycle: scan → batched reads → commit → notify → publish.
//!
//! The I/O runs without holding the engine lock. Cache lookups and the final
//! commit take the lock briefly; observers are called after it is released.

use std::sync::Arc;
use std::sync::atomic::Ordering;

use futures::future::join_all;
use tokio::time::Instant;
use tracing::{debug, info};

use super::core::CycleReads;
use super::{CycleOutcome, CycleReport, EngineInner};
use crate::fs::FileHandle;
use crate::watch::filters::FilterPipeline;
use crate::watch::scanner::scan_roots;

/// RAII flag marking a cycle in flight. At most one exists per engine.
pub(crate) struct CycleGuard {
    inner: Arc<EngineInner>,
}

impl CycleGuard {
    /// Take the in-flight flag, or `None` if a cycle already holds it.
    pub(crate) fn try_acquire(inner: &Arc<EngineInner>) -> Option<Self> {
        inner
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self {
                inner: Arc::clone(inner),
            })
    }
}

impl Drop for CycleGuard {
    fn drop(&mut self) {
        self.inner.in_flight.store(false, Ordering::Release);
    }
}

/// Run a cycle while holding `guard`.
pub(crate) async fn run_cycle(guard: CycleGuard) -> CycleOutcome {
    let inner = Arc::clone(&guard.inner);
    let outcome = execute(&inner).await;
    drop(guard);
    outcome
}

async fn execute(inner: &EngineInner) -> CycleOutcome {
    let started = Instant::now();
    let (ticket, roots) = {
        let core = inner.lock_core();
        (core.ticket(), core.roots())
    };

    let pipeline = FilterPipeline::instantiate(&inner.filters);
    let scan = scan_roots(&roots, &pipeline).await;

    let targets: Vec<(String, Arc<dyn FileHandle>)> = scan
        .files
        .iter()
        .map(|(path, handle)| (path.clone(), Arc::clone(handle)))
        .collect();
    let reads = read_in_batches(inner, &targets).await;

    let fresh_reads = reads.fresh.len();
    let cache_hits = reads.cached.len();
    let failed_reads = reads.failed.len();

    let commit = {
        let mut core = inner.lock_core();
        let commit = core.commit_cycle(ticket, scan, reads, Instant::now());
        if let Some(commit) = &commit {
            inner.publisher.commit(Arc::clone(&commit.snapshot));
        }
        commit
    };

    let Some(commit) = commit else {
        info!("engine cleared during cycle; results discarded");
        return CycleOutcome::Discarded;
    };

    inner.stats.cycles_completed.fetch_add(1, Ordering::Relaxed);
    debug!(
        files = commit.snapshot.len(),
        fresh_reads,
        cache_hits,
        failed_reads,
        added = commit.changes.added.len(),
        changed = commit.changes.changed.len(),
        deleted = commit.changes.deleted.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "cycle committed"
    );

    if !commit.changes.is_empty() {
        inner.observers.notify(&commit.changes, &commit.previous);
        inner.publisher.schedule();
    }

    CycleOutcome::Completed(CycleReport {
        added: commit.changes.added,
        changed: commit.changes.changed,
        deleted: commit.changes.deleted,
        previous: commit.previous,
        snapshot: commit.snapshot,
    })
}

/// Resolve content for every target, `batch_size` reads at a time.
///
/// Within a batch, cache hits are served first and the misses are read
/// concurrently; batches run one after another.
async fn read_in_batches(inner: &EngineInner, targets: &[(String, Arc<dyn FileHandle>)]) -> CycleReads {
    let mut reads = CycleReads::default();
    let batch_size = inner.options.batch_size.max(1);

    for batch in targets.chunks(batch_size) {
        let mut misses = Vec::with_capacity(batch.len());
        {
            let core = inner.lock_core();
            let now = Instant::now();
            for (path, handle) in batch {
                match core.cached(path, now) {
                    Some(content) => {
                        reads.cached.insert(path.clone(), content);
                    }
                    None => misses.push((path, handle)),
                }
            }
        }

        let results = join_all(misses.into_iter().map(|(path, handle)| async move {
            (path, handle.read_text().await)
        }))
        .await;

        for (path, result) in results {
            match result {
                Ok(content) => {
                    reads.fresh.insert(path.clone(), content);
                }
                Err(err) => {
                    debug!(path = %path, error = %err, "read failed; treating as deleted");
                    reads.failed.insert(path.clone());
                }
            }
        }
    }

    reads
}

