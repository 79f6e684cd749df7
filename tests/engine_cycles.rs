// tests/engine_cycles.rs

mod common;
use crate::common::{Harness, files, harness, harness_with, uncached};

use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use treewatch::engine::{CycleOutcome, EngineBuilder};
use treewatch::errors::WatchError;
use treewatch::fs::mock::{MockFileSystem, MockPicker};
use treewatch::types::WatchOptions;

type TestResult = Result<(), Box<dyn Error>>;

fn two_file_tree() -> MockFileSystem {
    let fs = MockFileSystem::new();
    fs.add_file("proj/x", "1");
    fs.add_file("proj/y", "2");
    fs
}

#[tokio::test]
async fn first_cycle_announces_every_file_as_added() -> TestResult {
    let h = harness(&two_file_tree(), &["proj"]);

    let report = h.cycle().await;

    let expected = files(&[("proj/x", "1"), ("proj/y", "2")]);
    assert_eq!(report.added, expected);
    assert!(report.changed.is_empty());
    assert!(report.deleted.is_empty());
    assert!(report.previous.is_empty());

    let added = h.events.added();
    assert_eq!(added.len(), 1, "added fires exactly once per cycle");
    assert_eq!(added[0].delta, expected);
    assert!(added[0].previous.is_empty());
    assert!(h.events.changed().is_empty());
    assert!(h.events.deleted().is_empty());

    assert_eq!(*h.engine.committed_snapshot(), expected);
    assert_eq!(h.engine.handle_count(), 2);
    Ok(())
}

#[tokio::test]
async fn change_and_removal_are_reported_against_the_previous_state() -> TestResult {
    let h = harness_with(&two_file_tree(), &["proj"], uncached(), None);
    h.cycle().await;
    h.events.clear();

    h.fs.add_file("proj/x", "3");
    assert!(h.fs.remove("proj/y"));
    let report = h.cycle().await;

    let before = files(&[("proj/x", "1"), ("proj/y", "2")]);
    assert_eq!(report.changed, files(&[("proj/x", "3")]));
    assert_eq!(report.deleted, files(&[("proj/y", "2")]));
    assert!(report.added.is_empty());

    let changed = h.events.changed();
    let deleted = h.events.deleted();
    assert_eq!(changed.len(), 1);
    assert_eq!(deleted.len(), 1);
    assert_eq!(changed[0].previous, before);
    assert_eq!(deleted[0].previous, before);
    assert!(h.events.added().is_empty());

    assert_eq!(*h.engine.committed_snapshot(), files(&[("proj/x", "3")]));
    assert_eq!(h.engine.handle_count(), 1);
    Ok(())
}

#[tokio::test]
async fn unchanged_tree_reports_nothing_on_the_second_cycle() -> TestResult {
    let h = harness_with(&two_file_tree(), &["proj"], uncached(), None);
    h.cycle().await;
    h.events.clear();

    let report = h.cycle().await;

    assert!(report.is_quiet());
    assert!(h.events.is_empty());
    assert_eq!(report.previous, report.snapshot);
    Ok(())
}

#[tokio::test]
async fn empty_root_produces_an_empty_snapshot() -> TestResult {
    let fs = MockFileSystem::new();
    fs.add_dir("proj");
    let h = harness(&fs, &["proj"]);

    let report = h.cycle().await;

    assert!(report.is_quiet());
    assert!(report.snapshot.is_empty());
    assert!(h.events.is_empty());
    Ok(())
}

#[tokio::test]
async fn failed_read_of_a_known_file_counts_as_deletion() -> TestResult {
    let h = harness_with(&two_file_tree(), &["proj"], uncached(), None);
    h.cycle().await;

    h.fs.fail_reads_of("proj/y");
    let report = h.cycle().await;

    assert_eq!(report.deleted, files(&[("proj/y", "2")]));
    assert!(!report.snapshot.contains_key("proj/y"));
    assert_eq!(h.engine.handle_count(), 1);
    Ok(())
}

#[tokio::test]
async fn failed_read_of_a_new_file_is_dropped_silently() -> TestResult {
    let h = harness(&two_file_tree(), &["proj"]);
    h.cycle().await;
    h.events.clear();

    h.fs.add_file("proj/z", "new");
    h.fs.fail_reads_of("proj/z");
    let report = h.cycle().await;

    assert!(report.is_quiet());
    assert!(h.events.is_empty());
    assert!(!report.snapshot.contains_key("proj/z"));
    Ok(())
}

#[tokio::test]
async fn nested_files_and_multiple_roots_are_labelled_by_root_name() -> TestResult {
    let fs = MockFileSystem::new();
    fs.add_file("app/src/main.rs", "fn main() {}");
    fs.add_file("app/README.md", "# app");
    fs.add_file("docs/index.md", "hello");
    let h = harness(&fs, &["app", "docs"]);

    let report = h.cycle().await;

    assert_eq!(
        report.added,
        files(&[
            ("app/README.md", "# app"),
            ("app/src/main.rs", "fn main() {}"),
            ("docs/index.md", "hello"),
        ])
    );
    assert_eq!(h.engine.roots(), vec!["app".to_string(), "docs".to_string()]);
    Ok(())
}

#[tokio::test]
async fn registering_a_root_with_the_same_label_replaces_it() -> TestResult {
    let first = MockFileSystem::new();
    first.add_file("proj/old.txt", "old");
    let second = MockFileSystem::new();
    second.add_file("proj/new.txt", "new");

    let h = harness(&first, &["proj"]);
    h.cycle().await;
    h.engine.add_root(second.directory("proj")?)?;

    let report = h.cycle().await;

    assert_eq!(h.engine.roots(), vec!["proj".to_string()]);
    assert_eq!(report.added, files(&[("proj/new.txt", "new")]));
    assert_eq!(report.deleted, files(&[("proj/old.txt", "old")]));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn second_cycle_is_skipped_while_one_is_in_flight() -> TestResult {
    let h = harness(&two_file_tree(), &["proj"]);
    h.fs.set_read_delay(Some(Duration::from_millis(100)));

    let (first, second) = tokio::join!(h.engine.run_cycle(), async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(h.engine.is_cycle_in_progress());
        h.engine.run_cycle().await
    });

    assert!(matches!(first, CycleOutcome::Completed(_)));
    assert!(matches!(second, CycleOutcome::Skipped));
    assert!(!h.engine.is_cycle_in_progress());
    assert_eq!(h.engine.stats().cycles_completed, 1);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn clear_discards_a_cycle_that_is_still_running() -> TestResult {
    let h = harness(&two_file_tree(), &["proj"]);
    h.fs.set_read_delay(Some(Duration::from_millis(100)));

    let (outcome, ()) = tokio::join!(h.engine.run_cycle(), async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        h.engine.clear();
    });

    assert!(matches!(outcome, CycleOutcome::Discarded));
    assert!(h.events.is_empty());
    assert!(h.engine.committed_snapshot().is_empty());
    assert!(h.engine.snapshot().is_empty());
    assert_eq!(h.engine.handle_count(), 0);
    assert!(h.engine.roots().is_empty());
    assert_eq!(h.engine.stats().cycles_completed, 0);
    Ok(())
}

#[tokio::test]
async fn cycle_after_clear_sees_no_roots() -> TestResult {
    let h: Harness = harness(&two_file_tree(), &["proj"]);
    h.cycle().await;

    h.engine.clear();
    let report = h.cycle().await;

    assert!(report.snapshot.is_empty());
    assert!(report.is_quiet());
    Ok(())
}

#[tokio::test]
async fn small_batches_read_every_file_exactly_once() -> TestResult {
    let fs = MockFileSystem::new();
    for i in 0..7 {
        fs.add_file(&format!("proj/f{i}.txt"), format!("content {i}"));
    }
    let h = harness_with(&fs, &["proj"], WatchOptions::default().with_batch_size(3), None);

    let report = h.cycle().await;

    assert_eq!(report.added.len(), 7);
    assert_eq!(h.fs.total_reads(), 7);
    Ok(())
}

#[tokio::test]
async fn select_root_registers_the_picked_directory() -> TestResult {
    let fs = two_file_tree();
    let picker = Arc::new(MockPicker::new());
    picker.grant(fs.directory("proj")?);
    let engine = EngineBuilder::new().picker(picker).autostart(false).build();

    engine.select_root().await?;

    assert_eq!(engine.roots(), vec!["proj".to_string()]);
    Ok(())
}

#[tokio::test]
async fn cancelled_selection_registers_nothing() -> TestResult {
    let engine = EngineBuilder::new()
        .picker(Arc::new(MockPicker::new()))
        .autostart(false)
        .build();

    let err = engine.select_root().await.expect_err("nothing was granted");

    assert!(matches!(err, WatchError::PermissionDeclined(_)));
    assert!(engine.roots().is_empty());
    Ok(())
}

#[tokio::test]
async fn unsupported_platform_rejects_roots() -> TestResult {
    let fs = two_file_tree();
    let engine = EngineBuilder::new()
        .picker(Arc::new(MockPicker::unsupported()))
        .build();

    assert!(!engine.is_supported());
    assert!(matches!(
        engine.select_root().await,
        Err(WatchError::UnsupportedPlatform)
    ));
    assert!(matches!(
        engine.add_root(fs.directory("proj")?),
        Err(WatchError::UnsupportedPlatform)
    ));
    assert!(engine.roots().is_empty());
    Ok(())
}
