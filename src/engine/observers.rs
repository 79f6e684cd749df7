// src/engine/observers.rs

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::types::FileMap;
use crate::watch::diff::ChangeSet;

/// Observer callback: `(delta, previous)`.
///
/// `delta` maps each affected path to its new content (added, changed) or to
/// its last known content (deleted). `previous` is the whole committed
/// snapshot before the change.
pub type ChangeCallback = Arc<dyn Fn(&FileMap, &FileMap) + Send + Sync>;

/// The three external notification hooks.
#[derive(Clone, Default)]
pub struct Observers {
    pub on_files_added: Option<ChangeCallback>,
    pub on_files_changed: Option<ChangeCallback>,
    pub on_files_deleted: Option<ChangeCallback>,
}

impl fmt::Debug for Observers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observers")
            .field("on_files_added", &self.on_files_added.is_some())
            .field("on_files_changed", &self.on_files_changed.is_some())
            .field("on_files_deleted", &self.on_files_deleted.is_some())
            .finish()
    }
}

impl Observers {
    /// Fire each callback whose delta is non-empty, at most once each.
    pub fn notify(&self, changes: &ChangeSet, previous: &FileMap) {
        fire(&self.on_files_added, "added", &changes.added, previous);
        fire(&self.on_files_changed, "changed", &changes.changed, previous);
        fire(&self.on_files_deleted, "deleted", &changes.deleted, previous);
    }

    pub fn notify_changed(&self, delta: &FileMap, previous: &FileMap) {
        fire(&self.on_files_changed, "changed", delta, previous);
    }

    pub fn notify_deleted(&self, delta: &FileMap, previous: &FileMap) {
        fire(&self.on_files_deleted, "deleted", delta, previous);
    }
}

fn fire(callback: &Option<ChangeCallback>, kind: &str, delta: &FileMap, previous: &FileMap) {
    if delta.is_empty() {
        return;
    }
    let paths: Vec<&str> = delta.keys().map(String::as_str).collect();
    debug!(kind, ?paths, "file notification");
    if let Some(cb) = callback {
        cb(delta, previous);
    }
}
