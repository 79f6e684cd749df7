// src/watch/scanner.rs

//! Recursive walk of the watched roots.
//!
//! Directories are evaluated before they are enumerated; a rejected
//! directory is recorded as excluded and its subtree is never visited, so no
//! filter is ever asked about a path beneath it. Subdirectories that survive
//! are walked concurrently and their results merged into shared maps.

use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex};

use futures::future::join_all;
use tracing::{debug, warn};

use crate::fs::{BoxFuture, DirectoryHandle, Entry, FileHandle};
use crate::watch::filters::FilterPipeline;
use crate::watch::path_utils::join;

/// Everything one scan discovered.
#[derive(Debug, Default)]
pub struct ScanResult {
    /// Included files, path → handle.
    pub files: BTreeMap<String, Arc<dyn FileHandle>>,
    /// Every directory that was processed (roots included).
    pub directories: BTreeMap<String, Arc<dyn DirectoryHandle>>,
    /// Paths rejected by the pipeline during this scan.
    pub excluded: HashSet<String>,
}

/// Shared, guarded state for one walk.
#[derive(Default)]
struct ScanState {
    files: Mutex<BTreeMap<String, Arc<dyn FileHandle>>>,
    directories: Mutex<BTreeMap<String, Arc<dyn DirectoryHandle>>>,
    excluded: Mutex<HashSet<String>>,
}

impl ScanState {
    fn is_excluded(&self, path: &str) -> bool {
        self.excluded
            .lock()
            .map(|set| set.contains(path))
            .unwrap_or(false)
    }

    fn exclude(&self, path: &str) {
        if let Ok(mut set) = self.excluded.lock() {
            set.insert(path.to_string());
        }
    }

    fn into_result(self) -> ScanResult {
        ScanResult {
            files: self.files.into_inner().unwrap_or_default(),
            directories: self.directories.into_inner().unwrap_or_default(),
            excluded: self.excluded.into_inner().unwrap_or_default(),
        }
    }
}

/// Walk every root with the given (freshly instantiated) pipeline.
pub async fn scan_roots(roots: &[Arc<dyn DirectoryHandle>], pipeline: &FilterPipeline) -> ScanResult {
    let state = ScanState::default();
    join_all(
        roots
            .iter()
            .map(|root| scan_directory(root.name().to_string(), Arc::clone(root), pipeline, &state)),
    )
    .await;
    let result = state.into_result();
    debug!(
        files = result.files.len(),
        directories = result.directories.len(),
        excluded = result.excluded.len(),
        "scan finished"
    );
    result
}

fn scan_directory<'a>(
    path: String,
    dir: Arc<dyn DirectoryHandle>,
    pipeline: &'a FilterPipeline,
    state: &'a ScanState,
) -> BoxFuture<'a, ()> {
    Box::pin(async move {
        if state.is_excluded(&path) {
            return;
        }
        if !pipeline.process_directory(&path, dir.as_ref()).await {
            debug!(dir = %path, "directory excluded");
            state.exclude(&path);
            return;
        }

        let entries = match dir.entries().await {
            Ok(entries) => entries,
            Err(err) => {
                warn!(dir = %path, error = %err, "failed to enumerate directory; skipping");
                return;
            }
        };
        if let Ok(mut dirs) = state.directories.lock() {
            dirs.insert(path.clone(), Arc::clone(&dir));
        }

        let mut subdirs = Vec::new();
        for entry in entries {
            match entry {
                Entry::File(file) => {
                    let file_path = join(&path, file.name());
                    if state.is_excluded(&file_path) {
                        continue;
                    }
                    if pipeline.include_file(&file_path, file.as_ref()).await {
                        if let Ok(mut files) = state.files.lock() {
                            files.insert(file_path, file);
                        }
                    } else {
                        if let Ok(mut files) = state.files.lock() {
                            files.remove(&file_path);
                        }
                        state.exclude(&file_path);
                    }
                }
                Entry::Directory(child) => {
                    let child_path = join(&path, child.name());
                    subdirs.push(scan_directory(child_path, child, pipeline, state));
                }
            }
        }

        join_all(subdirs).await;
    })
}
