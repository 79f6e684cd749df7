#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use treewatch::engine::{CycleOutcome, CycleReport, EngineBuilder, WatchEngine};
use treewatch::fs::mock::{MockFileSystem, MockPicker};
use treewatch::types::{FileMap, WatchOptions};
use treewatch::watch::filters::FilterFactory;

pub use treewatch_test_utils::{
    ConfigFileBuilder, Notification, NotificationKind, RecordingObservers, init_tracing, with_timeout,
};

/// An engine over a mock tree, driven manually through `run_cycle`.
pub struct Harness {
    pub fs: MockFileSystem,
    pub engine: WatchEngine,
    pub events: RecordingObservers,
}

impl Harness {
    /// Run one cycle and return its report, failing the test otherwise.
    pub async fn cycle(&self) -> CycleReport {
        match self.engine.run_cycle().await {
            CycleOutcome::Completed(report) => report,
            other => panic!("expected a completed cycle, got {other:?}"),
        }
    }
}

/// Default options, except that cached content never counts as fresh, so
/// every cycle re-reads every file.
pub fn uncached() -> WatchOptions {
    WatchOptions::default().with_file_cache_ttl(Duration::ZERO)
}

pub fn harness(fs: &MockFileSystem, roots: &[&str]) -> Harness {
    harness_with(fs, roots, WatchOptions::default(), None)
}

pub fn harness_with(
    fs: &MockFileSystem,
    roots: &[&str],
    options: WatchOptions,
    filters: Option<Vec<Arc<dyn FilterFactory>>>,
) -> Harness {
    init_tracing();
    let events = RecordingObservers::new();
    let mut builder = EngineBuilder::new()
        .options(options)
        .observers(events.observers())
        .picker(Arc::new(MockPicker::new()))
        .autostart(false);
    if let Some(filters) = filters {
        builder = builder.filters(filters);
    }
    let engine = builder.build();
    for root in roots {
        let dir = fs.directory(root).expect("root directory exists in mock tree");
        engine.add_root(dir).expect("mock picker is supported");
    }
    Harness {
        fs: fs.clone(),
        engine,
        events,
    }
}

/// Build a `FileMap` from `(path, content)` pairs.
pub fn files(pairs: &[(&str, &str)]) -> FileMap {
    pairs
        .iter()
        .map(|(p, c)| (p.to_string(), c.to_string()))
        .collect()
}
