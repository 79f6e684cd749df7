// src/watch/patterns.rs

//! Stateless exclusion filters: path-fragment blacklist, OS noise, and
//! user-configured exclude globs.
//!
//! All of them judge the path relative to its watched root, so a root that
//! happens to be called `build` is still watched.

use std::fmt;
use std::sync::Arc;

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};

use crate::fs::{BoxFuture, DirectoryHandle, FileHandle};
use crate::watch::filters::PathFilter;
use crate::watch::path_utils::{file_name, relative_to_root};

/// Path segments excluded by [`BlacklistFilter::default`].
pub const DEFAULT_BLACKLIST: &[&str] = &[
    "node_modules",
    "dist",
    "build",
    ".git",
    ".svn",
    ".hg",
    "target",
    ".next",
    ".cache",
    "__pycache__",
    ".venv",
    "venv",
    "coverage",
];

/// File names the OS or editors drop into directories.
const NOISE_FILES: &[&str] = &[
    ".DS_Store",
    "Thumbs.db",
    "desktop.ini",
    "ehthumbs.db",
    ".directory",
];

/// Directories that hold OS metadata rather than user files.
const NOISE_DIRECTORIES: &[&str] = &[
    ".Trashes",
    ".Spotlight-V100",
    ".fseventsd",
    ".TemporaryItems",
    "$RECYCLE.BIN",
    "System Volume Information",
];

/// Rejects any path with a segment (below the root) equal to one of the
/// configured fragments.
#[derive(Debug, Clone)]
pub struct BlacklistFilter {
    fragments: Arc<Vec<String>>,
}

impl Default for BlacklistFilter {
    fn default() -> Self {
        Self::new(DEFAULT_BLACKLIST.iter().map(|s| s.to_string()))
    }
}

impl BlacklistFilter {
    pub fn new<I, S>(fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fragments: Arc::new(fragments.into_iter().map(Into::into).collect()),
        }
    }

    pub fn is_blacklisted(&self, path: &str) -> bool {
        relative_to_root(path)
            .split('/')
            .any(|segment| self.fragments.iter().any(|f| f == segment))
    }
}

impl PathFilter for BlacklistFilter {
    fn should_include_file<'a>(&'a self, path: &'a str, _file: &'a dyn FileHandle) -> BoxFuture<'a, bool> {
        Box::pin(async move { !self.is_blacklisted(path) })
    }

    fn should_process_directory<'a>(&'a self, path: &'a str, _dir: &'a dyn DirectoryHandle) -> BoxFuture<'a, bool> {
        Box::pin(async move { !self.is_blacklisted(path) })
    }
}

/// Rejects OS metadata files and directories, AppleDouble (`._*`) files,
/// Office lock files (`~$*`) and in-progress write swap files (`*.crswap`).
#[derive(Debug, Clone, Copy, Default)]
pub struct OsNoiseFilter;

impl OsNoiseFilter {
    pub fn is_noise_file(name: &str) -> bool {
        NOISE_FILES.contains(&name)
            || name.starts_with("._")
            || name.starts_with("~$")
            || name.ends_with(crate::fs::local::SWAP_SUFFIX)
    }

    pub fn is_noise_directory(name: &str) -> bool {
        NOISE_DIRECTORIES.contains(&name)
    }
}

impl PathFilter for OsNoiseFilter {
    fn should_include_file<'a>(&'a self, path: &'a str, _file: &'a dyn FileHandle) -> BoxFuture<'a, bool> {
        Box::pin(async move { !Self::is_noise_file(file_name(path)) })
    }

    fn should_process_directory<'a>(&'a self, path: &'a str, _dir: &'a dyn DirectoryHandle) -> BoxFuture<'a, bool> {
        Box::pin(async move { !Self::is_noise_directory(file_name(path)) })
    }
}

/// Rejects paths matching any of a set of exclude globs.
///
/// Globs are matched against the root-relative path, e.g. `src/tmp/a.log`.
/// A directory matching a glob is pruned as a whole.
#[derive(Clone)]
pub struct GlobFilter {
    patterns: Arc<Vec<String>>,
    set: Arc<GlobSet>,
}

impl fmt::Debug for GlobFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GlobFilter")
            .field("patterns", &self.patterns)
            .finish_non_exhaustive()
    }
}

impl GlobFilter {
    pub fn new(patterns: &[String]) -> Result<Self> {
        let set = build_globset(patterns).context("building exclude globset")?;
        Ok(Self {
            patterns: Arc::new(patterns.to_vec()),
            set: Arc::new(set),
        })
    }

    pub fn is_excluded(&self, path: &str) -> bool {
        let rel = relative_to_root(path);
        !rel.is_empty() && self.set.is_match(rel)
    }
}

impl PathFilter for GlobFilter {
    fn should_include_file<'a>(&'a self, path: &'a str, _file: &'a dyn FileHandle) -> BoxFuture<'a, bool> {
        Box::pin(async move { !self.is_excluded(path) })
    }

    fn should_process_directory<'a>(&'a self, path: &'a str, _dir: &'a dyn DirectoryHandle) -> BoxFuture<'a, bool> {
        Box::pin(async move { !self.is_excluded(path) })
    }
}

/// Build a GlobSet from simple string patterns.
pub fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let glob = Glob::new(pat).with_context(|| format!("invalid glob pattern: {pat}"))?;
        builder.add(glob);
    }
    Ok(builder.build()?)
}
