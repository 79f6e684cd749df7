// src/fs/local.rs

//! Handles backed by the real filesystem (`tokio::fs`).

use std::collections::VecDeque;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result, anyhow};
use tokio::fs;
use tracing::{debug, warn};

use super::{BoxFuture, DirectoryHandle, DirectoryPicker, Entry, FileHandle, StagedWrite, WritableFile};
use crate::errors::WatchError;

/// Suffix of the sibling file a write transaction is committed through.
pub const SWAP_SUFFIX: &str = ".crswap";

fn name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

/// A directory on disk.
#[derive(Debug, Clone)]
pub struct LocalDirectory {
    name: String,
    path: PathBuf,
}

impl LocalDirectory {
    /// Open `path` as a directory handle. The root label is the directory's
    /// own name (canonicalized first, so `.` gets a real name).
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let path = std::fs::canonicalize(path).with_context(|| format!("canonicalizing {:?}", path))?;
        if !path.is_dir() {
            return Err(anyhow!("not a directory: {:?}", path));
        }
        Ok(Self {
            name: name_of(&path),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DirectoryHandle for LocalDirectory {
    fn name(&self) -> &str {
        &self.name
    }

    fn entries(&self) -> BoxFuture<'_, Result<Vec<Entry>>> {
        Box::pin(async move {
            let mut out = Vec::new();
            let mut rd = fs::read_dir(&self.path)
                .await
                .with_context(|| format!("reading dir {:?}", self.path))?;
            while let Some(entry) = rd.next_entry().await? {
                let file_type = match entry.file_type().await {
                    Ok(t) => t,
                    Err(err) => {
                        debug!(path = ?entry.path(), error = %err, "skipping entry with unreadable type");
                        continue;
                    }
                };
                let path = entry.path();
                let name = entry.file_name().to_string_lossy().into_owned();
                if file_type.is_file() {
                    out.push(Entry::File(Arc::new(LocalFile { name, path })));
                } else if file_type.is_dir() {
                    out.push(Entry::Directory(Arc::new(LocalDirectory { name, path })));
                }
            }
            Ok(out)
        })
    }

    fn get_file<'a>(&'a self, name: &'a str, create: bool) -> BoxFuture<'a, Result<Arc<dyn FileHandle>>> {
        Box::pin(async move {
            let path = self.path.join(name);
            match fs::metadata(&path).await {
                Ok(meta) if meta.is_file() => {}
                Ok(_) => return Err(anyhow!("not a file: {:?}", path)),
                Err(err) if err.kind() == io::ErrorKind::NotFound && create => {
                    fs::OpenOptions::new()
                        .write(true)
                        .create(true)
                        .truncate(false)
                        .open(&path)
                        .await
                        .with_context(|| format!("creating file {:?}", path))?;
                    debug!(?path, "created empty file");
                }
                Err(err) => {
                    return Err(anyhow::Error::new(err).context(format!("looking up file {:?}", path)));
                }
            }
            let handle: Arc<dyn FileHandle> = Arc::new(LocalFile {
                name: name.to_string(),
                path,
            });
            Ok(handle)
        })
    }

    fn remove_entry<'a>(&'a self, name: &'a str) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let path = self.path.join(name);
            fs::remove_file(&path)
                .await
                .with_context(|| format!("removing file {:?}", path))
        })
    }
}

/// A regular file on disk.
#[derive(Debug, Clone)]
pub struct LocalFile {
    name: String,
    path: PathBuf,
}

impl FileHandle for LocalFile {
    fn name(&self) -> &str {
        &self.name
    }

    fn read_text(&self) -> BoxFuture<'_, Result<String>> {
        Box::pin(async move {
            let bytes = fs::read(&self.path)
                .await
                .with_context(|| format!("reading file {:?}", self.path))?;
            Ok(String::from_utf8_lossy(&bytes).into_owned())
        })
    }

    fn create_writable(&self, keep_existing: bool) -> BoxFuture<'_, Result<Box<dyn WritableFile>>> {
        Box::pin(async move {
            let existing = if keep_existing {
                match fs::read(&self.path).await {
                    Ok(bytes) => Some(bytes),
                    Err(err) if err.kind() == io::ErrorKind::NotFound => None,
                    Err(err) => {
                        return Err(anyhow::Error::new(err)
                            .context(format!("seeding write for {:?}", self.path)));
                    }
                }
            } else {
                None
            };
            let writable: Box<dyn WritableFile> = Box::new(LocalWritable {
                target: self.path.clone(),
                staged: StagedWrite::new(existing),
            });
            Ok(writable)
        })
    }
}

/// Write transaction for a [`LocalFile`].
///
/// Content is staged in memory. `close` writes it to `.<name>.crswap` next
/// to the target and renames the swap file over it, so readers see either
/// the old or the new content.
struct LocalWritable {
    target: PathBuf,
    staged: StagedWrite,
}

fn swap_path(target: &Path) -> PathBuf {
    let name = format!(".{}{}", name_of(target), SWAP_SUFFIX);
    target.with_file_name(name)
}

impl WritableFile for LocalWritable {
    fn write<'a>(&'a mut self, data: &'a [u8]) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            self.staged.write(data);
            Ok(())
        })
    }

    fn close(self: Box<Self>) -> BoxFuture<'static, Result<()>> {
        Box::pin(async move {
            let LocalWritable { target, staged } = *self;
            let swap = swap_path(&target);
            let result = async {
                fs::write(&swap, staged.into_bytes())
                    .await
                    .with_context(|| format!("writing swap file {:?}", swap))?;
                fs::rename(&swap, &target)
                    .await
                    .with_context(|| format!("committing {:?}", target))
            }
            .await;
            if result.is_err() {
                if let Err(err) = fs::remove_file(&swap).await {
                    if err.kind() != io::ErrorKind::NotFound {
                        warn!(path = ?swap, error = %err, "failed to remove swap file");
                    }
                }
            }
            result
        })
    }

    fn abort(self: Box<Self>) -> BoxFuture<'static, Result<()>> {
        Box::pin(async move {
            debug!(path = ?self.target, "aborted write transaction");
            Ok(())
        })
    }
}

/// Picker that grants a fixed queue of directories, one per request.
///
/// Used by the CLI, where "granting" a root means naming it on the command
/// line. An empty queue behaves like a cancelled dialog.
#[derive(Debug, Default)]
pub struct LocalPicker {
    queue: Mutex<VecDeque<PathBuf>>,
}

impl LocalPicker {
    pub fn new<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            queue: Mutex::new(paths.into_iter().map(Into::into).collect()),
        }
    }

    /// Queue another directory for the next `pick_directory` call.
    pub fn push(&self, path: impl Into<PathBuf>) {
        if let Ok(mut queue) = self.queue.lock() {
            queue.push_back(path.into());
        }
    }
}

impl DirectoryPicker for LocalPicker {
    fn is_supported(&self) -> bool {
        true
    }

    fn pick_directory(&self) -> BoxFuture<'_, std::result::Result<Arc<dyn DirectoryHandle>, WatchError>> {
        Box::pin(async move {
            let next = self
                .queue
                .lock()
                .map_err(|_| WatchError::PermissionDeclined("picker state poisoned".to_string()))?
                .pop_front();
            let Some(path) = next else {
                return Err(WatchError::PermissionDeclined("no directory selected".to_string()));
            };
            let dir = LocalDirectory::open(&path)
                .map_err(|err| WatchError::PermissionDeclined(format!("{:?}: {err:#}", path)))?;
            let handle: Arc<dyn DirectoryHandle> = Arc::new(dir);
            Ok(handle)
        })
    }
}
