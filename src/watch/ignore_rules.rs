// src/watch/ignore_rules.rs

//! `.gitignore`-style rules discovered while the tree is being walked.
//!
//! When a directory is about to be processed, its `.gitignore` (if any) is
//! read through the directory handle and the rules are appended to the
//! cycle's accumulator as one compiled [`Gitignore`]. Rules only apply
//! beneath the directory that declared them.

use std::cmp::Reverse;
use std::sync::Mutex;

use ignore::gitignore::{Gitignore, GitignoreBuilder};
use tracing::{debug, warn};

use crate::fs::{BoxFuture, DirectoryHandle, FileHandle};
use crate::watch::filters::PathFilter;
use crate::watch::path_utils::relative_to;

pub const IGNORE_FILE_NAME: &str = ".gitignore";

/// Compile the content of an ignore file located in directory `base`.
///
/// Invalid lines are skipped with a warning; they never fail the scan.
pub fn parse_ignore_file(base: &str, content: &str) -> Gitignore {
    let mut builder = GitignoreBuilder::new(base);
    for line in content.lines() {
        if let Err(err) = builder.add_line(None, line) {
            warn!(base, line, error = %err, "skipping invalid ignore rule");
        }
    }
    match builder.build() {
        Ok(gitignore) => gitignore,
        Err(err) => {
            warn!(base, error = %err, "failed to compile ignore rules");
            Gitignore::empty()
        }
    }
}

/// Decide whether `path` is ignored.
///
/// Only ignore files declared in an ancestor of `path` apply. The deepest
/// one with a matching rule decides; within a file the last match wins.
pub fn is_ignored(ignores: &[Gitignore], path: &str, is_dir: bool) -> bool {
    let mut applicable: Vec<(usize, &Gitignore)> = ignores
        .iter()
        .filter_map(|gitignore| {
            let base = gitignore.path().to_str()?;
            relative_to(base, path)?;
            Some((base.len(), gitignore))
        })
        .collect();
    applicable.sort_by_key(|(depth, _)| Reverse(*depth));

    for (_, gitignore) in applicable {
        let verdict = gitignore.matched(path, is_dir);
        if verdict.is_ignore() {
            return true;
        }
        if verdict.is_whitelist() {
            return false;
        }
    }
    false
}

/// Number of patterns (ignores and whitelists) in a compiled ignore file.
pub fn rule_count(gitignore: &Gitignore) -> u64 {
    gitignore.num_ignores() + gitignore.num_whitelists()
}

/// Per-cycle filter that loads ignore files as the walk discovers them.
#[derive(Debug, Default)]
pub struct IgnoreRulesFilter {
    rules: Mutex<Vec<Gitignore>>,
}

impl IgnoreRulesFilter {
    pub fn new() -> Self {
        Self::default()
    }

    fn check(&self, path: &str, is_dir: bool) -> bool {
        match self.rules.lock() {
            Ok(rules) => is_ignored(&rules, path, is_dir),
            Err(_) => {
                warn!("ignore rules mutex poisoned; not ignoring {path}");
                false
            }
        }
    }

    async fn load_rules(&self, path: &str, dir: &dyn DirectoryHandle) {
        let file = match dir.get_file(IGNORE_FILE_NAME, false).await {
            Ok(file) => file,
            Err(_) => return,
        };
        let content = match file.read_text().await {
            Ok(content) => content,
            Err(err) => {
                warn!(dir = path, error = %err, "failed to read ignore file");
                return;
            }
        };
        let parsed = parse_ignore_file(path, &content);
        debug!(dir = path, rules = rule_count(&parsed), "loaded ignore rules");
        if let Ok(mut rules) = self.rules.lock() {
            rules.push(parsed);
        }
    }

    /// Number of patterns accumulated so far in this cycle.
    pub fn rule_count(&self) -> u64 {
        self.rules
            .lock()
            .map(|rules| rules.iter().map(rule_count).sum())
            .unwrap_or(0)
    }
}

impl PathFilter for IgnoreRulesFilter {
    fn should_include_file<'a>(&'a self, path: &'a str, _file: &'a dyn FileHandle) -> BoxFuture<'a, bool> {
        Box::pin(async move { !self.check(path, false) })
    }

    fn should_process_directory<'a>(&'a self, path: &'a str, dir: &'a dyn DirectoryHandle) -> BoxFuture<'a, bool> {
        Box::pin(async move {
            if self.check(path, true) {
                return false;
            }
            self.load_rules(path, dir).await;
            true
        })
    }
}
