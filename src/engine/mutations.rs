// src/engine/mutations.rs

//! Write, create and delete, applied directly through handles outside the
//! poll cycle and then committed to the same state the cycle owns.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::EngineInner;
use crate::errors::{Result, WatchError};
use crate::fs::{DirectoryHandle, FileHandle, WritableFile};
use crate::types::WriteOptions;
use crate::watch::path_utils::split_parent;

impl EngineInner {
    fn ensure_supported(&self) -> Result<()> {
        if self.supported {
            Ok(())
        } else {
            Err(WatchError::UnsupportedPlatform)
        }
    }

    /// Parent directory handle and leaf name for `path`.
    fn resolve_parent<'p>(&self, path: &'p str) -> Result<(Arc<dyn DirectoryHandle>, &'p str)> {
        let (parent, leaf) =
            split_parent(path).ok_or_else(|| WatchError::NotFound(format!("{path}: no parent directory")))?;
        let dir = self
            .lock_core()
            .directory(parent)
            .ok_or_else(|| WatchError::NotFound(format!("{parent}: directory is not watched")))?;
        Ok((dir, leaf))
    }

    /// Tracked handle for `path`, or a handle obtained through its parent.
    async fn file_handle(&self, path: &str, create: bool) -> Result<Arc<dyn FileHandle>> {
        let tracked = self.lock_core().handle(path);
        if let Some(handle) = tracked {
            return Ok(handle);
        }
        if !create {
            return Err(WatchError::NotFound(format!("{path}: no handle and creation not permitted")));
        }
        let (dir, leaf) = self.resolve_parent(path)?;
        dir.get_file(leaf, true)
            .await
            .map_err(|err| WatchError::NotFound(format!("{path}: {err:#}")))
    }

    pub(crate) async fn write_file(&self, path: &str, data: &str, opts: WriteOptions) -> Result<()> {
        self.ensure_supported()?;
        let ticket = self.lock_core().ticket();
        let handle = self.file_handle(path, opts.create).await?;

        write_scoped(handle.as_ref(), path, data.as_bytes(), !opts.truncate).await?;

        let commit = {
            let mut core = self.lock_core();
            let commit = core.commit_write(ticket, path, Arc::clone(&handle), data.to_string(), Instant::now());
            if let Some(commit) = &commit {
                self.publisher.commit(Arc::clone(&commit.snapshot));
            }
            commit
        };
        let Some(commit) = commit else {
            info!(path, "engine cleared during write; state not updated");
            return Ok(());
        };

        debug!(path, bytes = data.len(), had_content = commit.old_content.is_some(), "file written");
        let delta = BTreeMap::from([(path.to_string(), data.to_string())]);
        self.observers.notify_changed(&delta, &commit.previous);
        self.publisher.publish_now();
        Ok(())
    }

    pub(crate) async fn create_file(&self, path: &str, initial: Option<&str>) -> Result<()> {
        self.ensure_supported()?;
        let ticket = self.lock_core().ticket();
        let handle = self.file_handle(path, true).await?;
        match initial {
            Some(data) => {
                self.write_file(
                    path,
                    data,
                    WriteOptions {
                        create: true,
                        truncate: true,
                    },
                )
                .await
            }
            None => {
                let tracked = self.lock_core().track_handle(ticket, path, handle);
                if tracked {
                    debug!(path, "file created; next poll will report it");
                } else {
                    info!(path, "engine cleared during create; handle not tracked");
                }
                Ok(())
            }
        }
    }

    pub(crate) async fn delete_file(&self, path: &str) -> Result<()> {
        self.ensure_supported()?;
        let (ticket, tracked) = {
            let core = self.lock_core();
            (core.ticket(), core.handle(path).is_some())
        };
        if !tracked {
            return Err(WatchError::NotFound(format!("{path}: no tracked handle")));
        }
        let (dir, leaf) = self.resolve_parent(path)?;
        dir.remove_entry(leaf).await.map_err(|source| WatchError::RemoveFailure {
            path: path.to_string(),
            source,
        })?;

        let commit = {
            let mut core = self.lock_core();
            let commit = core.commit_delete(ticket, path);
            if let Some(commit) = &commit {
                self.publisher.commit(Arc::clone(&commit.snapshot));
            }
            commit
        };
        let Some(commit) = commit else {
            info!(path, "engine cleared during delete; state not updated");
            return Ok(());
        };

        debug!(path, "file deleted");
        // A file created without content was never reported, so nothing is.
        if let Some(old_content) = commit.old_content {
            let delta = BTreeMap::from([(path.to_string(), old_content)]);
            self.observers.notify_deleted(&delta, &commit.previous);
        }
        self.publisher.publish_now();
        Ok(())
    }
}

/// Run a write transaction to completion or abort it.
///
/// Any failure after the transaction is opened aborts it before the error is
/// returned, so no partial content is committed.
async fn write_scoped(handle: &dyn FileHandle, path: &str, data: &[u8], keep_existing: bool) -> Result<()> {
    let failure = |source: anyhow::Error| WatchError::WriteFailure {
        path: path.to_string(),
        source,
    };

    let mut writable = handle.create_writable(keep_existing).await.map_err(failure)?;
    if let Err(err) = writable.write(data).await {
        abort(writable, path).await;
        return Err(failure(err));
    }
    writable.close().await.map_err(failure)
}

async fn abort(writable: Box<dyn WritableFile>, path: &str) {
    if let Err(err) = writable.abort().await {
        warn!(path, error = %err, "failed to abort write transaction");
    }
}
