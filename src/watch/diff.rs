// src/watch/diff.rs

//! Classification of one cycle's reads against the previously committed
//! state.
//!
//! Pure: no I/O, no clock. The engine core feeds it the resolved contents,
//! the read failures and the previous snapshot and applies the result.

use std::collections::BTreeSet;

use crate::types::FileMap;

/// Deltas produced by one cycle.
///
/// - `added`: path → new content, for paths not known before.
/// - `changed`: path → new content, for known paths whose content differs.
/// - `deleted`: path → previous content, for known paths that disappeared or
///   failed their read.
///
/// A path appears in at most one of the three maps.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    pub added: FileMap,
    pub changed: FileMap,
    pub deleted: FileMap,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.changed.is_empty() && self.deleted.is_empty()
    }

    pub fn len(&self) -> usize {
        self.added.len() + self.changed.len() + self.deleted.len()
    }
}

/// Classify a cycle.
///
/// - `previous`: committed content before the cycle; its keys are the
///   previously seen paths.
/// - `resolved`: content of every path that was seen and read successfully.
/// - `failed`: paths that were seen by the scan but whose read failed.
///
/// A failed path counts as deleted if it was known before. A path that was
/// never committed and fails its read is dropped without notification.
pub fn classify(previous: &FileMap, resolved: &FileMap, failed: &BTreeSet<String>) -> ChangeSet {
    let mut changes = ChangeSet::default();

    for (path, content) in resolved {
        if failed.contains(path) {
            continue;
        }
        match previous.get(path) {
            None => {
                changes.added.insert(path.clone(), content.clone());
            }
            Some(old) if old != content => {
                changes.changed.insert(path.clone(), content.clone());
            }
            Some(_) => {}
        }
    }

    for (path, old) in previous {
        if failed.contains(path) || !resolved.contains_key(path) {
            changes.deleted.insert(path.clone(), old.clone());
        }
    }

    changes
}
