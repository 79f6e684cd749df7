// src/watch/filters.rs

//! Exclusion policy pipeline.
//!
//! A [`PathFilter`] answers two questions during a scan: should this file be
//! tracked, and should this directory be descended into. Filters are built
//! fresh for every scan cycle by a [`FilterFactory`], because some of them
//! (the ignore-file reader) accumulate state while the walk progresses.
//! Sibling directories are scanned concurrently, so filter state must be
//! behind a lock.

use std::fmt;
use std::sync::Arc;

use crate::fs::{BoxFuture, DirectoryHandle, FileHandle};
use crate::watch::ignore_rules::IgnoreRulesFilter;
use crate::watch::patterns::{BlacklistFilter, OsNoiseFilter};

/// One exclusion policy, valid for a single scan cycle.
pub trait PathFilter: Send + Sync {
    fn should_include_file<'a>(&'a self, path: &'a str, file: &'a dyn FileHandle) -> BoxFuture<'a, bool>;

    fn should_process_directory<'a>(&'a self, path: &'a str, dir: &'a dyn DirectoryHandle)
    -> BoxFuture<'a, bool>;
}

/// Produces a fresh [`PathFilter`] at the start of each scan cycle.
pub trait FilterFactory: Send + Sync {
    fn create(&self) -> Box<dyn PathFilter>;

    /// Short name for logs.
    fn name(&self) -> &str {
        "filter"
    }
}

impl<F> FilterFactory for F
where
    F: Fn() -> Box<dyn PathFilter> + Send + Sync,
{
    fn create(&self) -> Box<dyn PathFilter> {
        self()
    }
}

/// Factory for filters that carry no per-cycle state and can simply be
/// cloned.
#[derive(Clone)]
pub struct StatelessFactory<T> {
    name: &'static str,
    filter: T,
}

impl<T> StatelessFactory<T> {
    pub fn new(name: &'static str, filter: T) -> Self {
        Self { name, filter }
    }
}

impl<T> FilterFactory for StatelessFactory<T>
where
    T: PathFilter + Clone + 'static,
{
    fn create(&self) -> Box<dyn PathFilter> {
        Box::new(self.filter.clone())
    }

    fn name(&self) -> &str {
        self.name
    }
}

/// Factory for [`IgnoreRulesFilter`]; each cycle starts with no rules.
#[derive(Debug, Clone, Default)]
pub struct IgnoreRulesFactory;

impl FilterFactory for IgnoreRulesFactory {
    fn create(&self) -> Box<dyn PathFilter> {
        Box::new(IgnoreRulesFilter::new())
    }

    fn name(&self) -> &str {
        "ignore-rules"
    }
}

/// The built-in set: path-fragment blacklist, OS noise, ignore files.
///
/// The ignore-file filter goes last so that it only reads `.gitignore` files
/// in directories every other policy has already accepted.
pub fn default_filters() -> Vec<Arc<dyn FilterFactory>> {
    vec![
        Arc::new(StatelessFactory::new("blacklist", BlacklistFilter::default())),
        Arc::new(StatelessFactory::new("os-noise", OsNoiseFilter)),
        Arc::new(IgnoreRulesFactory),
    ]
}

/// The filters instantiated for one cycle, combined by conjunction.
///
/// Evaluation stops at the first filter that rejects.
pub struct FilterPipeline {
    filters: Vec<Box<dyn PathFilter>>,
}

impl fmt::Debug for FilterPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterPipeline")
            .field("filters", &self.filters.len())
            .finish()
    }
}

impl FilterPipeline {
    /// Instantiate every factory for a new cycle.
    pub fn instantiate(factories: &[Arc<dyn FilterFactory>]) -> Self {
        Self {
            filters: factories.iter().map(|f| f.create()).collect(),
        }
    }

    pub fn from_filters(filters: Vec<Box<dyn PathFilter>>) -> Self {
        Self { filters }
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    pub async fn include_file(&self, path: &str, file: &dyn FileHandle) -> bool {
        for filter in &self.filters {
            if !filter.should_include_file(path, file).await {
                return false;
            }
        }
        true
    }

    pub async fn process_directory(&self, path: &str, dir: &dyn DirectoryHandle) -> bool {
        for filter in &self.filters {
            if !filter.should_process_directory(path, dir).await {
                return false;
            }
        }
        true
    }
}
