// src/engine/core.rs

//! Pure engine state.
//!
//! `EngineCore` owns everything a cycle or a mutation reconciles: the
//! watched roots, the directory index, the path → handle map, the content
//! cache and the committed snapshot. It performs no I/O and never awaits;
//! the async shell (`engine::runtime`, `engine::mutations`) does the I/O
//! outside the lock and hands the results in here to be committed in one
//! step.
//!
//! Two counters keep concurrent work honest:
//! - `generation` changes on every `clear()`. A cycle or mutation that
//!   started under an older generation is discarded at commit.
//! - `mutation_epoch` increases with every mutation. A cycle that began
//!   before a mutation of some path leaves that path exactly as the mutation
//!   committed it.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

use crate::fs::{DirectoryHandle, FileHandle};
use crate::types::FileMap;
use crate::watch::cache::ContentCache;
use crate::watch::diff::{ChangeSet, classify};
use crate::watch::scanner::ScanResult;

/// Captured at the start of a cycle or mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleTicket {
    pub generation: u64,
    pub epoch: u64,
}

/// What a cycle read, handed to [`EngineCore::commit_cycle`].
#[derive(Debug, Default)]
pub struct CycleReads {
    /// Content served from the cache.
    pub cached: FileMap,
    /// Content read through the handle this cycle.
    pub fresh: FileMap,
    /// Paths whose read failed.
    pub failed: BTreeSet<String>,
}

/// Result of a committed cycle.
#[derive(Debug, Clone)]
pub struct CycleCommit {
    pub changes: ChangeSet,
    /// Committed snapshot before the cycle.
    pub previous: Arc<FileMap>,
    /// Committed snapshot after the cycle.
    pub snapshot: Arc<FileMap>,
}

/// Result of a committed mutation.
#[derive(Debug, Clone)]
pub struct MutationCommit {
    /// Content the path had before the mutation, if it was known.
    pub old_content: Option<String>,
    pub previous: Arc<FileMap>,
    pub snapshot: Arc<FileMap>,
}

#[derive(Debug)]
pub struct EngineCore {
    roots: BTreeMap<String, Arc<dyn DirectoryHandle>>,
    directories: BTreeMap<String, Arc<dyn DirectoryHandle>>,
    handles: BTreeMap<String, Arc<dyn FileHandle>>,
    cache: ContentCache,
    snapshot: Arc<FileMap>,
    generation: u64,
    mutation_epoch: u64,
    mutated: HashMap<String, u64>,
}

impl EngineCore {
    pub fn new(file_cache_ttl: Duration) -> Self {
        Self {
            roots: BTreeMap::new(),
            directories: BTreeMap::new(),
            handles: BTreeMap::new(),
            cache: ContentCache::new(file_cache_ttl),
            snapshot: Arc::new(FileMap::new()),
            generation: 0,
            mutation_epoch: 0,
            mutated: HashMap::new(),
        }
    }

    /// Register a watched root. Returns true if a root with the same label
    /// was replaced.
    pub fn register_root(&mut self, root: Arc<dyn DirectoryHandle>) -> bool {
        let label = root.name().to_string();
        self.directories.insert(label.clone(), Arc::clone(&root));
        self.roots.insert(label, root).is_some()
    }

    pub fn roots(&self) -> Vec<Arc<dyn DirectoryHandle>> {
        self.roots.values().cloned().collect()
    }

    pub fn root_labels(&self) -> Vec<String> {
        self.roots.keys().cloned().collect()
    }

    pub fn has_roots(&self) -> bool {
        !self.roots.is_empty()
    }

    pub fn ticket(&self) -> CycleTicket {
        CycleTicket {
            generation: self.generation,
            epoch: self.mutation_epoch,
        }
    }

    pub fn is_current(&self, ticket: CycleTicket) -> bool {
        ticket.generation == self.generation
    }

    pub fn handle(&self, path: &str) -> Option<Arc<dyn FileHandle>> {
        self.handles.get(path).cloned()
    }

    /// A watched root or a directory found beneath one by the last scan.
    pub fn directory(&self, path: &str) -> Option<Arc<dyn DirectoryHandle>> {
        self.roots
            .get(path)
            .or_else(|| self.directories.get(path))
            .cloned()
    }

    pub fn handle_count(&self) -> usize {
        self.handles.len()
    }

    pub fn snapshot(&self) -> Arc<FileMap> {
        Arc::clone(&self.snapshot)
    }

    /// Cached content for `path`, if still within the TTL.
    pub fn cached(&self, path: &str, now: Instant) -> Option<String> {
        self.cache.get(path, now).map(|(content, _hit)| content)
    }

    /// Content the cache holds for `path` regardless of age.
    pub fn cache_peek(&self, path: &str) -> Option<&str> {
        self.cache.peek(path)
    }

    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    fn mutated_since(&self, path: &str, epoch: u64) -> bool {
        self.mutated.get(path).is_some_and(|e| *e > epoch)
    }

    /// Commit a finished cycle.
    ///
    /// Returns `None` if the engine was cleared after `ticket` was taken; in
    /// that case nothing changes.
    pub fn commit_cycle(
        &mut self,
        ticket: CycleTicket,
        scan: ScanResult,
        reads: CycleReads,
        now: Instant,
    ) -> Option<CycleCommit> {
        if !self.is_current(ticket) {
            debug!(
                ticket = ticket.generation,
                current = self.generation,
                "discarding cycle started before clear"
            );
            return None;
        }

        let CycleReads {
            cached,
            fresh,
            mut failed,
        } = reads;
        let ScanResult {
            files: mut scanned,
            directories,
            ..
        } = scan;

        let mut resolved = cached;
        resolved.extend(fresh.iter().map(|(p, c)| (p.clone(), c.clone())));

        // Paths mutated while this cycle was running keep the mutation's view.
        let overridden: Vec<String> = self
            .mutated
            .iter()
            .filter(|(_, e)| **e > ticket.epoch)
            .map(|(p, _)| p.clone())
            .collect();
        for path in &overridden {
            failed.remove(path);
            match (self.handles.get(path), self.snapshot.get(path)) {
                (Some(handle), Some(content)) => {
                    scanned.insert(path.clone(), Arc::clone(handle));
                    resolved.insert(path.clone(), content.clone());
                }
                _ => {
                    scanned.remove(path);
                    resolved.remove(path);
                }
            }
        }
        for path in &failed {
            resolved.remove(path);
            scanned.remove(path);
        }
        scanned.retain(|path, _| resolved.contains_key(path));

        let previous = Arc::clone(&self.snapshot);
        let changes = classify(&previous, &resolved, &failed);

        for (path, content) in fresh {
            if resolved.contains_key(&path) && !self.mutated_since(&path, ticket.epoch) {
                self.cache.put(&path, content, now);
            }
        }
        for path in failed.iter().chain(changes.deleted.keys()) {
            self.cache.remove(path);
        }
        self.cache.evict_expired(now);

        self.handles = scanned;
        self.directories = directories;
        for (label, root) in &self.roots {
            self.directories
                .entry(label.clone())
                .or_insert_with(|| Arc::clone(root));
        }
        self.snapshot = Arc::new(resolved);
        self.mutated.clear();

        Some(CycleCommit {
            changes,
            previous,
            snapshot: Arc::clone(&self.snapshot),
        })
    }

    /// Commit a successful write of `content` to `path`.
    ///
    /// Returns `None` if the engine was cleared while the write was running.
    pub fn commit_write(
        &mut self,
        ticket: CycleTicket,
        path: &str,
        handle: Arc<dyn FileHandle>,
        content: String,
        now: Instant,
    ) -> Option<MutationCommit> {
        if !self.is_current(ticket) {
            return None;
        }
        let previous = Arc::clone(&self.snapshot);
        let old_content = previous.get(path).cloned();

        self.handles.insert(path.to_string(), handle);
        self.cache.put(path, content.clone(), now);
        Arc::make_mut(&mut self.snapshot).insert(path.to_string(), content);
        self.bump_epoch(path);

        Some(MutationCommit {
            old_content,
            previous,
            snapshot: Arc::clone(&self.snapshot),
        })
    }

    /// Track a handle for a file created without content.
    ///
    /// The snapshot is left alone, so the next cycle still reports the file
    /// as added. Returns false if the engine was cleared meanwhile.
    pub fn track_handle(&mut self, ticket: CycleTicket, path: &str, handle: Arc<dyn FileHandle>) -> bool {
        if !self.is_current(ticket) {
            return false;
        }
        self.handles.insert(path.to_string(), handle);
        true
    }

    /// Commit a successful removal of `path`.
    pub fn commit_delete(&mut self, ticket: CycleTicket, path: &str) -> Option<MutationCommit> {
        if !self.is_current(ticket) {
            return None;
        }
        let previous = Arc::clone(&self.snapshot);
        let old_content = previous.get(path).cloned();

        self.handles.remove(path);
        self.cache.remove(path);
        Arc::make_mut(&mut self.snapshot).remove(path);
        self.bump_epoch(path);

        Some(MutationCommit {
            old_content,
            previous,
            snapshot: Arc::clone(&self.snapshot),
        })
    }

    fn bump_epoch(&mut self, path: &str) {
        self.mutation_epoch += 1;
        self.mutated.insert(path.to_string(), self.mutation_epoch);
    }

    /// Drop every root, handle, cache entry and the snapshot, and invalidate
    /// any work that is still in flight.
    pub fn clear(&mut self) {
        self.generation += 1;
        self.roots.clear();
        self.directories.clear();
        self.handles.clear();
        self.cache.clear();
        self.snapshot = Arc::new(FileMap::new());
        self.mutated.clear();
    }
}
