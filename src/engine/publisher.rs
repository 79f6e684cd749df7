// src/engine/publisher.rs

//! Snapshot publisher: raw committed state plus a debounced observable view.
//!
//! Every commit stores the new map as the latest raw value. Poll cycles then
//! call [`SnapshotPublisher::schedule`], which restarts a quiet-period timer
//! in a background task; once no further signal arrives for the debounce
//! interval, the *latest* raw value is published. Mutations call
//! [`SnapshotPublisher::publish_now`] instead. Since the delayed publish
//! always reads the latest value, it can never roll back a newer mutation.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::timeout;
use tracing::{debug, trace};

use crate::types::FileMap;

#[derive(Debug)]
struct Shared {
    latest: Mutex<Arc<FileMap>>,
    view: watch::Sender<Arc<FileMap>>,
}

impl Shared {
    fn latest(&self) -> Arc<FileMap> {
        match self.latest.lock() {
            Ok(latest) => Arc::clone(&latest),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    fn publish_latest(&self) {
        let latest = self.latest();
        debug!(files = latest.len(), "publishing snapshot");
        self.view.send_replace(latest);
    }
}

#[derive(Debug)]
pub struct SnapshotPublisher {
    shared: Arc<Shared>,
    dirty_tx: mpsc::UnboundedSender<()>,
}

impl SnapshotPublisher {
    /// Create the publisher and spawn its debounce task.
    ///
    /// Must be called from within a Tokio runtime. The task exits once the
    /// publisher is dropped.
    pub fn spawn(debounce: Duration) -> Self {
        let empty = Arc::new(FileMap::new());
        let (view, _rx) = watch::channel(Arc::clone(&empty));
        let shared = Arc::new(Shared {
            latest: Mutex::new(empty),
            view,
        });
        let (dirty_tx, dirty_rx) = mpsc::unbounded_channel();
        tokio::spawn(debounce_loop(Arc::clone(&shared), dirty_rx, debounce));
        Self { shared, dirty_tx }
    }

    /// Record a newly committed raw snapshot. Does not publish.
    pub fn commit(&self, snapshot: Arc<FileMap>) {
        match self.shared.latest.lock() {
            Ok(mut latest) => *latest = snapshot,
            Err(poisoned) => *poisoned.into_inner() = snapshot,
        }
    }

    /// Publish the latest raw snapshot once updates go quiet.
    pub fn schedule(&self) {
        if self.dirty_tx.send(()).is_err() {
            // Debounce task is gone (runtime shutting down); publish directly.
            self.shared.publish_latest();
        }
    }

    /// Publish the latest raw snapshot immediately.
    pub fn publish_now(&self) {
        self.shared.publish_latest();
    }

    /// Last committed raw snapshot.
    pub fn committed(&self) -> Arc<FileMap> {
        self.shared.latest()
    }

    /// Current debounced view.
    pub fn current(&self) -> Arc<FileMap> {
        Arc::clone(&self.shared.view.borrow())
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<FileMap>> {
        self.shared.view.subscribe()
    }
}

async fn debounce_loop(shared: Arc<Shared>, mut dirty_rx: mpsc::UnboundedReceiver<()>, quiet: Duration) {
    while dirty_rx.recv().await.is_some() {
        loop {
            match timeout(quiet, dirty_rx.recv()).await {
                Ok(Some(())) => {
                    trace!("snapshot update within quiet period; restarting debounce");
                }
                Ok(None) => {
                    shared.publish_latest();
                    return;
                }
                Err(_elapsed) => break,
            }
        }
        shared.publish_latest();
    }
    debug!("snapshot publisher finished");
}
