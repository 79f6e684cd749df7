// src/config/model.rs

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use crate::errors::Result;
use crate::types::{
    DEFAULT_BATCH_SIZE, DEFAULT_DEBOUNCE_INTERVAL, DEFAULT_FILE_CACHE_TTL, DEFAULT_POLL_INTERVAL, WatchOptions,
};
use crate::watch::filters::{FilterFactory, IgnoreRulesFactory, StatelessFactory};
use crate::watch::patterns::{BlacklistFilter, GlobFilter, OsNoiseFilter};

/// Configuration as read from a TOML file, before validation.
///
/// ```toml
/// [watch]
/// poll_interval_ms = 100
/// batch_size = 50
///
/// [filters]
/// blacklist_fragments = ["node_modules", "dist"]
/// exclude = ["**/*.tmp"]
/// ```
///
/// Both sections are optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfigFile {
    #[serde(default)]
    pub watch: WatchSection,

    #[serde(default)]
    pub filters: FiltersSection,
}

/// `[watch]` section: timing and batching.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WatchSection {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Reads issued concurrently within one batch.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    #[serde(default = "default_debounce_interval_ms")]
    pub debounce_interval_ms: u64,

    #[serde(default = "default_file_cache_ttl_ms")]
    pub file_cache_ttl_ms: u64,
}

fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL.as_millis() as u64
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

fn default_debounce_interval_ms() -> u64 {
    DEFAULT_DEBOUNCE_INTERVAL.as_millis() as u64
}

fn default_file_cache_ttl_ms() -> u64 {
    DEFAULT_FILE_CACHE_TTL.as_millis() as u64
}

impl Default for WatchSection {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            batch_size: default_batch_size(),
            debounce_interval_ms: default_debounce_interval_ms(),
            file_cache_ttl_ms: default_file_cache_ttl_ms(),
        }
    }
}

/// `[filters]` section: which exclusion policies run, in this order:
/// blacklist, OS noise, the `exclude` globs, then ignore files.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FiltersSection {
    /// Honour `.gitignore` files found while scanning.
    #[serde(default = "default_true")]
    pub ignore_files: bool,

    #[serde(default = "default_true")]
    pub blacklist: bool,

    #[serde(default = "default_true")]
    pub os_noise: bool,

    /// Replaces the built-in blacklist when set.
    #[serde(default)]
    pub blacklist_fragments: Option<Vec<String>>,

    /// Extra globs, matched against root-relative paths.
    #[serde(default)]
    pub exclude: Vec<String>,
}

fn default_true() -> bool {
    true
}

impl Default for FiltersSection {
    fn default() -> Self {
        Self {
            ignore_files: true,
            blacklist: true,
            os_noise: true,
            blacklist_fragments: None,
            exclude: Vec::new(),
        }
    }
}

/// A validated configuration. Built from [`RawConfigFile`] via `TryFrom`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigFile {
    pub watch: WatchSection,
    pub filters: FiltersSection,
}

impl ConfigFile {
    /// Build without validation; callers outside this module go through
    /// `TryFrom<RawConfigFile>`.
    pub(crate) fn new_unchecked(watch: WatchSection, filters: FiltersSection) -> Self {
        Self { watch, filters }
    }

    pub fn watch_options(&self) -> WatchOptions {
        WatchOptions::default()
            .with_poll_interval(Duration::from_millis(self.watch.poll_interval_ms))
            .with_batch_size(self.watch.batch_size)
            .with_debounce_interval(Duration::from_millis(self.watch.debounce_interval_ms))
            .with_file_cache_ttl(Duration::from_millis(self.watch.file_cache_ttl_ms))
    }

    /// The exclusion pipeline described by `[filters]`.
    pub fn filter_factories(&self) -> Result<Vec<Arc<dyn FilterFactory>>> {
        let f = &self.filters;
        let mut factories: Vec<Arc<dyn FilterFactory>> = Vec::new();

        if f.blacklist {
            let filter = match &f.blacklist_fragments {
                Some(fragments) => BlacklistFilter::new(fragments.iter().cloned()),
                None => BlacklistFilter::default(),
            };
            factories.push(Arc::new(StatelessFactory::new("blacklist", filter)));
        }
        if f.os_noise {
            factories.push(Arc::new(StatelessFactory::new("os-noise", OsNoiseFilter)));
        }
        if !f.exclude.is_empty() {
            let globs = GlobFilter::new(&f.exclude)?;
            factories.push(Arc::new(StatelessFactory::new("exclude", globs)));
        }
        if f.ignore_files {
            factories.push(Arc::new(IgnoreRulesFactory));
        }

        Ok(factories)
    }
}
