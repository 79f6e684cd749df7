// tests/scheduler.rs

mod common;
use crate::common::{files, init_tracing};

use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use treewatch::engine::{EngineBuilder, WatchEngine};
use treewatch::fs::mock::{MockFileSystem, MockPicker};
use treewatch::types::WatchOptions;

type TestResult = Result<(), Box<dyn Error>>;

fn polling_engine(options: WatchOptions) -> WatchEngine {
    init_tracing();
    EngineBuilder::new()
        .options(options)
        .picker(Arc::new(MockPicker::new()))
        .build()
}

#[tokio::test(start_paused = true)]
async fn ticks_during_a_slow_cycle_are_skipped() -> TestResult {
    let fs = MockFileSystem::new();
    fs.add_file("proj/a.txt", "a");
    fs.set_read_delay(Some(Duration::from_millis(250)));
    let engine = polling_engine(
        WatchOptions::default()
            .with_poll_interval(Duration::from_millis(100))
            .with_file_cache_ttl(Duration::ZERO),
    );

    engine.add_root(fs.directory("proj")?)?;

    sleep(Duration::from_millis(150)).await;
    assert!(engine.is_cycle_in_progress());
    assert_eq!(engine.stats().cycles_completed, 0);
    assert_eq!(engine.stats().skipped_ticks, 1);

    sleep(Duration::from_millis(110)).await;
    assert!(!engine.is_cycle_in_progress());
    assert_eq!(engine.stats().cycles_completed, 1);
    assert_eq!(engine.stats().skipped_ticks, 2, "ticks at 100ms and 200ms were no-ops");
    assert_eq!(fs.read_count("proj/a.txt"), 1);
    assert_eq!(*engine.committed_snapshot(), files(&[("proj/a.txt", "a")]));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn start_is_idempotent() -> TestResult {
    let fs = MockFileSystem::new();
    fs.add_file("proj/a.txt", "a");
    let engine = polling_engine(WatchOptions::default().with_poll_interval(Duration::from_millis(100)));

    engine.add_root(fs.directory("proj")?)?;
    engine.start();
    engine.start();

    sleep(Duration::from_millis(350)).await;

    assert_eq!(engine.stats().cycles_completed, 4, "one tick each at 0, 100, 200 and 300ms");
    assert_eq!(fs.list_count("proj"), 4);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn clear_stops_polling() -> TestResult {
    let fs = MockFileSystem::new();
    fs.add_file("proj/a.txt", "a");
    let engine = polling_engine(WatchOptions::default());
    engine.add_root(fs.directory("proj")?)?;
    sleep(Duration::from_millis(250)).await;
    assert!(fs.list_count("proj") > 0);

    engine.clear();
    let listed = fs.list_count("proj");
    sleep(Duration::from_millis(500)).await;

    assert_eq!(fs.list_count("proj"), listed);
    assert!(engine.roots().is_empty());
    assert!(engine.snapshot().is_empty());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn dropping_the_engine_stops_polling() -> TestResult {
    let fs = MockFileSystem::new();
    fs.add_file("proj/a.txt", "a");
    let engine = polling_engine(WatchOptions::default());
    engine.add_root(fs.directory("proj")?)?;
    sleep(Duration::from_millis(250)).await;

    drop(engine);
    let listed = fs.list_count("proj");
    sleep(Duration::from_millis(500)).await;

    assert_eq!(fs.list_count("proj"), listed);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn selected_root_is_polled_and_changes_are_picked_up() -> TestResult {
    let fs = MockFileSystem::new();
    fs.add_file("proj/a.txt", "a");
    let picker = Arc::new(MockPicker::new());
    picker.grant(fs.directory("proj")?);
    let engine = EngineBuilder::new()
        .options(WatchOptions::default().with_file_cache_ttl(Duration::ZERO))
        .picker(picker)
        .build();

    engine.select_root().await?;
    sleep(Duration::from_millis(50)).await;
    assert_eq!(*engine.committed_snapshot(), files(&[("proj/a.txt", "a")]));

    fs.add_file("proj/b.txt", "b");
    sleep(Duration::from_millis(200)).await;
    assert_eq!(
        *engine.snapshot(),
        files(&[("proj/a.txt", "a"), ("proj/b.txt", "b")])
    );
    Ok(())
}
