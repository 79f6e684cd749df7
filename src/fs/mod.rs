// src/fs/mod.rs

//! Handle-based filesystem capabilities.
//!
//! The engine never touches paths on disk directly. It is given opaque
//! directory handles (one per watched root) and discovers file handles by
//! enumerating them. This keeps the engine independent of where the tree
//! lives: [`local`] backs handles with `tokio::fs`, [`mock`] with an
//! in-memory tree for tests.

use std::fmt::Debug;
use std::sync::Arc;

use anyhow::Result;

use crate::errors::WatchError;

pub mod local;
pub mod mock;

/// Boxed, `Send` future returned by the handle traits.
pub use futures::future::BoxFuture;

/// One child of a directory, partitioned by kind.
#[derive(Debug, Clone)]
pub enum Entry {
    File(Arc<dyn FileHandle>),
    Directory(Arc<dyn DirectoryHandle>),
}

impl Entry {
    pub fn name(&self) -> &str {
        match self {
            Entry::File(f) => f.name(),
            Entry::Directory(d) => d.name(),
        }
    }
}

/// Capability to enumerate one directory and manage its direct children.
pub trait DirectoryHandle: Send + Sync + Debug {
    /// Name of this directory (the last path segment).
    fn name(&self) -> &str;

    /// List direct children. Entries that are neither files nor directories
    /// (sockets, dangling links, ...) are skipped.
    fn entries(&self) -> BoxFuture<'_, Result<Vec<Entry>>>;

    /// Look up a direct child file, creating an empty one if `create` is set.
    fn get_file<'a>(&'a self, name: &'a str, create: bool)
    -> BoxFuture<'a, Result<Arc<dyn FileHandle>>>;

    /// Remove a direct child file.
    fn remove_entry<'a>(&'a self, name: &'a str) -> BoxFuture<'a, Result<()>>;
}

/// Capability to read and write one file.
pub trait FileHandle: Send + Sync + Debug {
    fn name(&self) -> &str;

    /// Read the whole file as text. Invalid UTF-8 is replaced, not rejected.
    fn read_text(&self) -> BoxFuture<'_, Result<String>>;

    /// Open a write transaction. Nothing is visible on disk until
    /// [`WritableFile::close`] succeeds.
    fn create_writable(&self, keep_existing: bool) -> BoxFuture<'_, Result<Box<dyn WritableFile>>>;
}

/// An open write transaction.
///
/// Dropping a transaction without closing it discards everything written.
pub trait WritableFile: Send {
    fn write<'a>(&'a mut self, data: &'a [u8]) -> BoxFuture<'a, Result<()>>;

    /// Commit the staged content.
    fn close(self: Box<Self>) -> BoxFuture<'static, Result<()>>;

    /// Discard the staged content.
    fn abort(self: Box<Self>) -> BoxFuture<'static, Result<()>>;
}

/// The platform's permission/picker flow.
///
/// `is_supported` is probed once when the engine is built; a picker that
/// reports `false` makes every operation needing file access fail fast with
/// [`WatchError::UnsupportedPlatform`].
pub trait DirectoryPicker: Send + Sync + Debug {
    fn is_supported(&self) -> bool;

    /// Ask for a directory. Cancellation or denial is
    /// [`WatchError::PermissionDeclined`].
    fn pick_directory(&self) -> BoxFuture<'_, std::result::Result<Arc<dyn DirectoryHandle>, WatchError>>;
}

/// Picker for platforms without directory access at all.
#[derive(Debug, Clone, Default)]
pub struct UnsupportedPicker;

impl DirectoryPicker for UnsupportedPicker {
    fn is_supported(&self) -> bool {
        false
    }

    fn pick_directory(&self) -> BoxFuture<'_, std::result::Result<Arc<dyn DirectoryHandle>, WatchError>> {
        Box::pin(async { Err(WatchError::UnsupportedPlatform) })
    }
}

/// In-memory staging buffer shared by the write transactions of both
/// backends.
///
/// Writes land at a cursor that starts at offset 0. With `keep_existing`
/// the buffer is seeded with the current file content, so a shorter write
/// leaves the tail of the old content in place.
#[derive(Debug, Default, Clone)]
pub struct StagedWrite {
    buffer: Vec<u8>,
    cursor: usize,
}

impl StagedWrite {
    pub fn new(existing: Option<Vec<u8>>) -> Self {
        Self {
            buffer: existing.unwrap_or_default(),
            cursor: 0,
        }
    }

    pub fn write(&mut self, data: &[u8]) {
        let end = self.cursor + data.len();
        if end > self.buffer.len() {
            self.buffer.resize(end, 0);
        }
        self.buffer[self.cursor..end].copy_from_slice(data);
        self.cursor = end;
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }
}
