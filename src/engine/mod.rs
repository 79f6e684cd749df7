// src/engine/mod.rs

//! The watch engine.
//!
//! [`WatchEngine`] is the single owner of everything a poll cycle touches.
//! It is a thin handle around a shared [`EngineInner`] that holds:
//! - the pure state in [`core::EngineCore`], behind one mutex
//! - the observer callbacks
//! - the two-stage snapshot publisher
//! - the in-flight flag and the scheduler task
//!
//! The cycle itself lives in [`runtime`], the polling loop in [`scheduler`]
//! and the write/create/delete operations in [`mutations`].

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::errors::{Result, WatchError};
use crate::fs::{DirectoryHandle, DirectoryPicker, UnsupportedPicker};
use crate::types::{FileMap, WatchOptions, WriteOptions};
use crate::watch::filters::{FilterFactory, default_filters};

pub mod core;
pub mod mutations;
pub mod observers;
pub mod publisher;
pub mod runtime;
pub mod scheduler;

pub use self::core::EngineCore;
pub use observers::{ChangeCallback, Observers};
pub use publisher::SnapshotPublisher;

/// What one call to [`WatchEngine::run_cycle`] did.
#[derive(Debug, Clone)]
pub enum CycleOutcome {
    /// The cycle committed. The deltas may all be empty.
    Completed(CycleReport),
    /// Another cycle was already in flight; nothing ran.
    Skipped,
    /// The engine was cleared while the cycle ran; its results were dropped.
    Discarded,
}

impl CycleOutcome {
    pub fn report(&self) -> Option<&CycleReport> {
        match self {
            CycleOutcome::Completed(report) => Some(report),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CycleReport {
    pub added: FileMap,
    pub changed: FileMap,
    pub deleted: FileMap,
    /// Committed snapshot before the cycle.
    pub previous: Arc<FileMap>,
    /// Committed snapshot after the cycle.
    pub snapshot: Arc<FileMap>,
}

impl CycleReport {
    pub fn is_quiet(&self) -> bool {
        self.added.is_empty() && self.changed.is_empty() && self.deleted.is_empty()
    }
}

#[derive(Debug, Default)]
pub(crate) struct EngineStats {
    pub(crate) cycles_completed: AtomicU64,
    pub(crate) skipped_ticks: AtomicU64,
}

/// Point-in-time copy of the engine counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineStatsSnapshot {
    pub cycles_completed: u64,
    pub skipped_ticks: u64,
}

/// State shared between the engine handle, the scheduler and running cycles.
pub(crate) struct EngineInner {
    pub(crate) options: WatchOptions,
    pub(crate) filters: Vec<Arc<dyn FilterFactory>>,
    pub(crate) observers: Observers,
    pub(crate) core: Mutex<EngineCore>,
    pub(crate) publisher: SnapshotPublisher,
    pub(crate) in_flight: AtomicBool,
    pub(crate) stats: EngineStats,
    pub(crate) scheduler: Mutex<Option<JoinHandle<()>>>,
    pub(crate) picker: Arc<dyn DirectoryPicker>,
    pub(crate) supported: bool,
    autostart: bool,
}

impl EngineInner {
    /// Lock the core state. A panic in an observer must not wedge the engine,
    /// so a poisoned lock is recovered.
    pub(crate) fn lock_core(&self) -> MutexGuard<'_, EngineCore> {
        match self.core.lock() {
            Ok(core) => core,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn lock_scheduler(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        match self.scheduler.lock() {
            Ok(slot) => slot,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// Builder for [`WatchEngine`].
pub struct EngineBuilder {
    filters: Vec<Arc<dyn FilterFactory>>,
    options: WatchOptions,
    observers: Observers,
    picker: Arc<dyn DirectoryPicker>,
    autostart: bool,
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self {
            filters: default_filters(),
            options: WatchOptions::default(),
            observers: Observers::default(),
            picker: Arc::new(UnsupportedPicker),
            autostart: true,
        }
    }
}

impl fmt::Debug for EngineBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let filters: Vec<&str> = self.filters.iter().map(|f| f.name()).collect();
        f.debug_struct("EngineBuilder")
            .field("filters", &filters)
            .field("options", &self.options)
            .field("observers", &self.observers)
            .field("picker", &self.picker)
            .field("autostart", &self.autostart)
            .finish()
    }
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the exclusion policies. An empty list includes everything.
    pub fn filters(mut self, filters: Vec<Arc<dyn FilterFactory>>) -> Self {
        self.filters = filters;
        self
    }

    pub fn options(mut self, options: WatchOptions) -> Self {
        self.options = options;
        self
    }

    pub fn on_files_added<F>(mut self, callback: F) -> Self
    where
        F: Fn(&FileMap, &FileMap) + Send + Sync + 'static,
    {
        self.observers.on_files_added = Some(Arc::new(callback));
        self
    }

    pub fn on_files_changed<F>(mut self, callback: F) -> Self
    where
        F: Fn(&FileMap, &FileMap) + Send + Sync + 'static,
    {
        self.observers.on_files_changed = Some(Arc::new(callback));
        self
    }

    pub fn on_files_deleted<F>(mut self, callback: F) -> Self
    where
        F: Fn(&FileMap, &FileMap) + Send + Sync + 'static,
    {
        self.observers.on_files_deleted = Some(Arc::new(callback));
        self
    }

    /// Install all three callbacks at once.
    pub fn observers(mut self, observers: Observers) -> Self {
        self.observers = observers;
        self
    }

    pub fn picker(mut self, picker: Arc<dyn DirectoryPicker>) -> Self {
        self.picker = picker;
        self
    }

    /// Whether registering a root starts the poll scheduler (default true).
    /// With `false`, cycles only run through [`WatchEngine::run_cycle`] or
    /// after an explicit [`WatchEngine::start`].
    pub fn autostart(mut self, autostart: bool) -> Self {
        self.autostart = autostart;
        self
    }

    /// Build the engine. Must be called from within a Tokio runtime, since
    /// the snapshot publisher spawns its debounce task here.
    pub fn build(self) -> WatchEngine {
        let supported = self.picker.is_supported();
        if !supported {
            warn!("directory picker unsupported; engine will reject roots and mutations");
        }
        let inner = EngineInner {
            core: Mutex::new(EngineCore::new(self.options.file_cache_ttl)),
            publisher: SnapshotPublisher::spawn(self.options.debounce_interval),
            options: self.options,
            filters: self.filters,
            observers: self.observers,
            in_flight: AtomicBool::new(false),
            stats: EngineStats::default(),
            scheduler: Mutex::new(None),
            picker: self.picker,
            supported,
            autostart: self.autostart,
        };
        WatchEngine {
            inner: Arc::new(inner),
        }
    }
}

/// Poll-and-diff watcher over one or more directory trees.
pub struct WatchEngine {
    inner: Arc<EngineInner>,
}

impl fmt::Debug for WatchEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchEngine")
            .field("roots", &self.roots())
            .field("options", &self.inner.options)
            .field("supported", &self.inner.supported)
            .finish()
    }
}

impl WatchEngine {
    pub fn builder() -> EngineBuilder {
        EngineBuilder::new()
    }

    /// Ask the picker for a directory, watch it and start polling.
    pub async fn select_root(&self) -> Result<()> {
        if !self.inner.supported {
            return Err(WatchError::UnsupportedPlatform);
        }
        let root = match self.inner.picker.pick_directory().await {
            Ok(root) => root,
            Err(err) => {
                warn!(error = %err, "directory selection failed");
                return Err(err);
            }
        };
        self.add_root(root)
    }

    /// Watch an already granted directory and, unless autostart is off,
    /// start polling.
    pub fn add_root(&self, root: Arc<dyn DirectoryHandle>) -> Result<()> {
        if !self.inner.supported {
            return Err(WatchError::UnsupportedPlatform);
        }
        let label = root.name().to_string();
        let replaced = self.inner.lock_core().register_root(root);
        info!(root = %label, replaced, "watching root");
        if self.inner.autostart {
            self.start();
        }
        Ok(())
    }

    /// Start the poll scheduler. Calling it while it runs is a no-op.
    pub fn start(&self) {
        let mut slot = self.inner.lock_scheduler();
        if slot.as_ref().is_some_and(|task| !task.is_finished()) {
            return;
        }
        *slot = Some(scheduler::spawn_scheduler(&self.inner));
    }

    /// Stop polling and forget every root, handle, cached content and the
    /// snapshot. A cycle still in flight is discarded when it tries to commit.
    pub fn clear(&self) {
        if let Some(task) = self.inner.lock_scheduler().take() {
            task.abort();
        }
        self.inner.lock_core().clear();
        self.inner.publisher.commit(Arc::new(FileMap::new()));
        self.inner.publisher.publish_now();
        info!("engine cleared");
    }

    /// Run one cycle now, unless one is already in flight.
    pub async fn run_cycle(&self) -> CycleOutcome {
        match runtime::CycleGuard::try_acquire(&self.inner) {
            Some(guard) => runtime::run_cycle(guard).await,
            None => CycleOutcome::Skipped,
        }
    }

    /// Write `data` to `path`, then commit it and fire "changed" at once.
    ///
    /// With `truncate` off (the default) the bytes are written over the start
    /// of the existing file, and a longer old tail stays on disk. The snapshot
    /// and cache still hold only `data`, so once the cached entry expires the
    /// next poll reads the full file and reports it as changed.
    pub async fn write_file(&self, path: &str, data: &str, opts: WriteOptions) -> Result<()> {
        self.inner.write_file(path, data, opts).await
    }

    pub async fn create_file(&self, path: &str, initial: Option<&str>) -> Result<()> {
        self.inner.create_file(path, initial).await
    }

    pub async fn delete_file(&self, path: &str) -> Result<()> {
        self.inner.delete_file(path).await
    }

    /// Debounced view of the committed snapshot.
    pub fn snapshot(&self) -> Arc<FileMap> {
        self.inner.publisher.current()
    }

    /// Committed snapshot, without waiting for the debounce.
    pub fn committed_snapshot(&self) -> Arc<FileMap> {
        self.inner.publisher.committed()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<FileMap>> {
        self.inner.publisher.subscribe()
    }

    pub fn handle_count(&self) -> usize {
        self.inner.lock_core().handle_count()
    }

    pub fn is_cycle_in_progress(&self) -> bool {
        self.inner.in_flight.load(Ordering::Acquire)
    }

    pub fn is_supported(&self) -> bool {
        self.inner.supported
    }

    /// Labels of the watched roots.
    pub fn roots(&self) -> Vec<String> {
        self.inner.lock_core().root_labels()
    }

    pub fn stats(&self) -> EngineStatsSnapshot {
        EngineStatsSnapshot {
            cycles_completed: self.inner.stats.cycles_completed.load(Ordering::Relaxed),
            skipped_ticks: self.inner.stats.skipped_ticks.load(Ordering::Relaxed),
        }
    }
}

impl Drop for WatchEngine {
    fn drop(&mut self) {
        if let Some(task) = self.inner.lock_scheduler().take() {
            task.abort();
        }
    }
}
