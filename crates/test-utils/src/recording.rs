#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use treewatch::engine::Observers;
use treewatch::types::FileMap;

/// Which callback fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Added,
    Changed,
    Deleted,
}

/// One recorded callback invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub kind: NotificationKind,
    pub delta: FileMap,
    pub previous: FileMap,
}

/// Observer set that records every notification in order.
#[derive(Debug, Clone, Default)]
pub struct RecordingObservers {
    log: Arc<Mutex<Vec<Notification>>>,
}

impl RecordingObservers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Callbacks that append to this recorder.
    pub fn observers(&self) -> Observers {
        Observers {
            on_files_added: Some(self.callback(NotificationKind::Added)),
            on_files_changed: Some(self.callback(NotificationKind::Changed)),
            on_files_deleted: Some(self.callback(NotificationKind::Deleted)),
        }
    }

    fn callback(&self, kind: NotificationKind) -> treewatch::engine::ChangeCallback {
        let log = Arc::clone(&self.log);
        Arc::new(move |delta: &FileMap, previous: &FileMap| {
            log.lock().unwrap().push(Notification {
                kind,
                delta: delta.clone(),
                previous: previous.clone(),
            });
        })
    }

    pub fn all(&self) -> Vec<Notification> {
        self.log.lock().unwrap().clone()
    }

    pub fn of(&self, kind: NotificationKind) -> Vec<Notification> {
        self.all().into_iter().filter(|n| n.kind == kind).collect()
    }

    pub fn added(&self) -> Vec<Notification> {
        self.of(NotificationKind::Added)
    }

    pub fn changed(&self) -> Vec<Notification> {
        self.of(NotificationKind::Changed)
    }

    pub fn deleted(&self) -> Vec<Notification> {
        self.of(NotificationKind::Deleted)
    }

    pub fn len(&self) -> usize {
        self.log.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.log.lock().unwrap().clear();
    }
}
