// src/fs/mock.rs

//! In-memory tree exposing the same handle capabilities as [`super::local`].
//!
//! Besides backing tests, the mock counts reads and enumerations per path and
//! can inject latency and failures, which is what the cache, scheduler and
//! write-abort behaviour are verified against.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use anyhow::{Result, anyhow};

use super::{BoxFuture, DirectoryHandle, DirectoryPicker, Entry, FileHandle, StagedWrite, WritableFile};
use crate::errors::WatchError;

#[derive(Debug, Clone)]
pub enum MockEntry {
    File(Vec<u8>),
    Dir(Vec<String>), // List of child names
}

#[derive(Debug, Default)]
struct MockState {
    entries: HashMap<String, MockEntry>,
    reads: HashMap<String, usize>,
    listings: HashMap<String, usize>,
    read_delay: Option<Duration>,
    list_delay: Option<Duration>,
    fail_reads: Vec<String>,
    fail_writes: bool,
    fail_removes: bool,
}

/// Shared in-memory tree. Cloning shares the same tree.
///
/// Paths are `/`-joined labels whose first segment is a root name, exactly as
/// the engine reports them: `add_file("proj/src/a.txt", "..")` creates the
/// root `proj` and the directory `proj/src` implicitly.
#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    state: Arc<Mutex<MockState>>,
}

fn parent_and_name(path: &str) -> Option<(&str, &str)> {
    path.rsplit_once('/')
}

impl MockFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        // A panic while holding the lock only happens inside a failing test.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Create or overwrite a file, creating parent directories as needed.
    pub fn add_file(&self, path: &str, content: impl Into<Vec<u8>>) {
        let mut state = self.lock();
        state.entries.insert(path.to_string(), MockEntry::File(content.into()));
        if let Some((parent, name)) = parent_and_name(path) {
            Self::ensure_dir_entry(&mut state.entries, parent);
            Self::link_child(&mut state.entries, parent, name);
        }
    }

    /// Create an (empty) directory, including its parents.
    pub fn add_dir(&self, path: &str) {
        let mut state = self.lock();
        Self::ensure_dir_entry(&mut state.entries, path);
    }

    /// Remove a file or a whole directory subtree. Returns false if nothing
    /// was there.
    pub fn remove(&self, path: &str) -> bool {
        let mut state = self.lock();
        Self::remove_locked(&mut state.entries, path)
    }

    fn remove_locked(entries: &mut HashMap<String, MockEntry>, path: &str) -> bool {
        let Some(removed) = entries.remove(path) else {
            return false;
        };
        if let MockEntry::Dir(children) = removed {
            for child in children {
                Self::remove_locked(entries, &format!("{path}/{child}"));
            }
        }
        if let Some((parent, name)) = parent_and_name(path) {
            if let Some(MockEntry::Dir(children)) = entries.get_mut(parent) {
                children.retain(|c| c != name);
            }
        }
        true
    }

    fn ensure_dir_entry(entries: &mut HashMap<String, MockEntry>, path: &str) {
        if entries.contains_key(path) {
            return;
        }
        entries.insert(path.to_string(), MockEntry::Dir(Vec::new()));
        if let Some((parent, name)) = parent_and_name(path) {
            Self::ensure_dir_entry(entries, parent);
            Self::link_child(entries, parent, name);
        }
    }

    fn link_child(entries: &mut HashMap<String, MockEntry>, parent: &str, name: &str) {
        if let Some(MockEntry::Dir(children)) = entries.get_mut(parent) {
            if !children.iter().any(|c| c == name) {
                children.push(name.to_string());
            }
        }
    }

    /// Handle for an existing directory, e.g. a root to hand to the engine.
    pub fn directory(&self, path: &str) -> Result<Arc<dyn DirectoryHandle>> {
        match self.lock().entries.get(path) {
            Some(MockEntry::Dir(_)) => {}
            _ => return Err(anyhow!("Not a directory or not found: {:?}", path)),
        }
        let handle: Arc<dyn DirectoryHandle> = Arc::new(MockDirectory {
            fs: self.clone(),
            path: path.to_string(),
            name: leaf(path).to_string(),
        });
        Ok(handle)
    }

    /// Current content of a file, if it exists.
    pub fn content(&self, path: &str) -> Option<String> {
        match self.lock().entries.get(path) {
            Some(MockEntry::File(bytes)) => Some(String::from_utf8_lossy(bytes).into_owned()),
            _ => None,
        }
    }

    pub fn exists(&self, path: &str) -> bool {
        self.lock().entries.contains_key(path)
    }

    /// All files currently in the tree, path → content.
    pub fn files(&self) -> BTreeMap<String, String> {
        self.lock()
            .entries
            .iter()
            .filter_map(|(path, entry)| match entry {
                MockEntry::File(bytes) => Some((path.clone(), String::from_utf8_lossy(bytes).into_owned())),
                MockEntry::Dir(_) => None,
            })
            .collect()
    }

    /// Number of successful-or-not `read_text` calls for `path`.
    pub fn read_count(&self, path: &str) -> usize {
        self.lock().reads.get(path).copied().unwrap_or(0)
    }

    /// Sum of `read_text` calls across all files.
    pub fn total_reads(&self) -> usize {
        self.lock().reads.values().sum()
    }

    /// Number of `entries` calls for the directory at `path`.
    pub fn list_count(&self, path: &str) -> usize {
        self.lock().listings.get(path).copied().unwrap_or(0)
    }

    /// Paths of every directory that was enumerated at least once.
    pub fn listed_dirs(&self) -> Vec<String> {
        let mut dirs: Vec<String> = self.lock().listings.keys().cloned().collect();
        dirs.sort();
        dirs
    }

    pub fn reset_counters(&self) {
        let mut state = self.lock();
        state.reads.clear();
        state.listings.clear();
    }

    /// Delay every `read_text` by `delay` (tokio time).
    pub fn set_read_delay(&self, delay: Option<Duration>) {
        self.lock().read_delay = delay;
    }

    /// Delay every `entries` call by `delay` (tokio time).
    pub fn set_list_delay(&self, delay: Option<Duration>) {
        self.lock().list_delay = delay;
    }

    /// Make reads of `path` fail even though the file exists.
    pub fn fail_reads_of(&self, path: &str) {
        self.lock().fail_reads.push(path.to_string());
    }

    /// Make every write transaction fail on `write`.
    pub fn set_fail_writes(&self, fail: bool) {
        self.lock().fail_writes = fail;
    }

    /// Make every `remove_entry` fail.
    pub fn set_fail_removes(&self, fail: bool) {
        self.lock().fail_removes = fail;
    }
}

fn leaf(path: &str) -> &str {
    parent_and_name(path).map(|(_, name)| name).unwrap_or(path)
}

#[derive(Debug, Clone)]
struct MockDirectory {
    fs: MockFileSystem,
    path: String,
    name: String,
}

impl DirectoryHandle for MockDirectory {
    fn name(&self) -> &str {
        &self.name
    }

    fn entries(&self) -> BoxFuture<'_, Result<Vec<Entry>>> {
        Box::pin(async move {
            let delay = {
                let mut state = self.fs.lock();
                *state.listings.entry(self.path.clone()).or_insert(0) += 1;
                state.list_delay
            };
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }

            let state = self.fs.lock();
            let children = match state.entries.get(&self.path) {
                Some(MockEntry::Dir(children)) => children.clone(),
                _ => return Err(anyhow!("Not a directory or not found: {:?}", self.path)),
            };
            let mut out = Vec::with_capacity(children.len());
            for name in children {
                let path = format!("{}/{}", self.path, name);
                match state.entries.get(&path) {
                    Some(MockEntry::File(_)) => out.push(Entry::File(Arc::new(MockFile {
                        fs: self.fs.clone(),
                        path,
                        name,
                    }))),
                    Some(MockEntry::Dir(_)) => out.push(Entry::Directory(Arc::new(MockDirectory {
                        fs: self.fs.clone(),
                        path,
                        name,
                    }))),
                    None => {}
                }
            }
            Ok(out)
        })
    }

    fn get_file<'a>(&'a self, name: &'a str, create: bool) -> BoxFuture<'a, Result<Arc<dyn FileHandle>>> {
        Box::pin(async move {
            let path = format!("{}/{}", self.path, name);
            let existing = self.fs.lock().entries.get(&path).cloned();
            match existing {
                Some(MockEntry::File(_)) => {}
                Some(MockEntry::Dir(_)) => return Err(anyhow!("Is a directory: {:?}", path)),
                None if create => self.fs.add_file(&path, Vec::new()),
                None => return Err(anyhow!("File not found: {:?}", path)),
            }
            let handle: Arc<dyn FileHandle> = Arc::new(MockFile {
                fs: self.fs.clone(),
                path,
                name: name.to_string(),
            });
            Ok(handle)
        })
    }

    fn remove_entry<'a>(&'a self, name: &'a str) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let path = format!("{}/{}", self.path, name);
            let mut state = self.fs.lock();
            if state.fail_removes {
                return Err(anyhow!("remove rejected: {:?}", path));
            }
            if MockFileSystem::remove_locked(&mut state.entries, &path) {
                Ok(())
            } else {
                Err(anyhow!("File not found: {:?}", path))
            }
        })
    }
}

#[derive(Debug, Clone)]
struct MockFile {
    fs: MockFileSystem,
    path: String,
    name: String,
}

impl FileHandle for MockFile {
    fn name(&self) -> &str {
        &self.name
    }

    /// The content is captured when the read starts; the configured delay
    /// then models transfer time, so a slow read can return stale data.
    fn read_text(&self) -> BoxFuture<'_, Result<String>> {
        Box::pin(async move {
            let (result, delay) = {
                let mut state = self.fs.lock();
                *state.reads.entry(self.path.clone()).or_insert(0) += 1;
                let result = if state.fail_reads.iter().any(|p| p == &self.path) {
                    Err(anyhow!("read rejected: {:?}", self.path))
                } else {
                    match state.entries.get(&self.path) {
                        Some(MockEntry::File(content)) => Ok(String::from_utf8_lossy(content).into_owned()),
                        Some(MockEntry::Dir(_)) => Err(anyhow!("Is a directory: {:?}", self.path)),
                        None => Err(anyhow!("File not found: {:?}", self.path)),
                    }
                };
                (result, state.read_delay)
            };
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            result
        })
    }

    fn create_writable(&self, keep_existing: bool) -> BoxFuture<'_, Result<Box<dyn WritableFile>>> {
        Box::pin(async move {
            let existing = if keep_existing {
                match self.fs.lock().entries.get(&self.path) {
                    Some(MockEntry::File(content)) => Some(content.clone()),
                    _ => None,
                }
            } else {
                None
            };
            let writable: Box<dyn WritableFile> = Box::new(MockWritable {
                fs: self.fs.clone(),
                path: self.path.clone(),
                staged: StagedWrite::new(existing),
            });
            Ok(writable)
        })
    }
}

struct MockWritable {
    fs: MockFileSystem,
    path: String,
    staged: StagedWrite,
}

impl WritableFile for MockWritable {
    fn write<'a>(&'a mut self, data: &'a [u8]) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            if self.fs.lock().fail_writes {
                return Err(anyhow!("write rejected: {:?}", self.path));
            }
            self.staged.write(data);
            Ok(())
        })
    }

    fn close(self: Box<Self>) -> BoxFuture<'static, Result<()>> {
        Box::pin(async move {
            let MockWritable { fs, path, staged } = *self;
            fs.add_file(&path, staged.into_bytes());
            Ok(())
        })
    }

    fn abort(self: Box<Self>) -> BoxFuture<'static, Result<()>> {
        Box::pin(async { Ok(()) })
    }
}

/// Picker handing out pre-registered mock directories in order.
#[derive(Debug, Default)]
pub struct MockPicker {
    queue: Mutex<VecDeque<Arc<dyn DirectoryHandle>>>,
    unsupported: bool,
}

impl MockPicker {
    pub fn new() -> Self {
        Self::default()
    }

    /// A picker on a platform without directory access.
    pub fn unsupported() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            unsupported: true,
        }
    }

    pub fn grant(&self, dir: Arc<dyn DirectoryHandle>) {
        if let Ok(mut queue) = self.queue.lock() {
            queue.push_back(dir);
        }
    }
}

impl DirectoryPicker for MockPicker {
    fn is_supported(&self) -> bool {
        !self.unsupported
    }

    fn pick_directory(&self) -> BoxFuture<'_, std::result::Result<Arc<dyn DirectoryHandle>, WatchError>> {
        Box::pin(async move {
            if self.unsupported {
                return Err(WatchError::UnsupportedPlatform);
            }
            let next = self
                .queue
                .lock()
                .map_err(|_| WatchError::PermissionDeclined("picker state poisoned".to_string()))?
                .pop_front();
            next.ok_or_else(|| WatchError::PermissionDeclined("user cancelled".to_string()))
        })
    }
}
