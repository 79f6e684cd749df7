// tests/filters.rs

mod common;
use crate::common::{files, harness, harness_with};

use std::error::Error;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use treewatch::fs::mock::MockFileSystem;
use treewatch::fs::{BoxFuture, DirectoryHandle, FileHandle};
use treewatch::types::WatchOptions;
use treewatch::watch::filters::{FilterFactory, FilterPipeline, PathFilter, StatelessFactory};
use treewatch::watch::ignore_rules::{is_ignored, parse_ignore_file, rule_count};
use treewatch::watch::patterns::{BlacklistFilter, GlobFilter, OsNoiseFilter};

type TestResult = Result<(), Box<dyn Error>>;

#[tokio::test]
async fn default_filters_skip_blacklisted_directories_entirely() -> TestResult {
    let fs = MockFileSystem::new();
    fs.add_file("proj/a.txt", "a");
    fs.add_file("proj/dist/b.txt", "b");
    fs.add_file("proj/dist/.gitignore", "*");
    fs.add_file("proj/node_modules/pkg/index.js", "js");
    let h = harness(&fs, &["proj"]);

    let report = h.cycle().await;

    assert_eq!(report.added, files(&[("proj/a.txt", "a")]));
    let listed = h.fs.listed_dirs();
    assert!(!listed.iter().any(|d| d.starts_with("proj/dist")), "listed: {listed:?}");
    assert!(!listed.iter().any(|d| d.starts_with("proj/node_modules")), "listed: {listed:?}");
    assert_eq!(h.fs.read_count("proj/dist/b.txt"), 0);
    assert_eq!(h.fs.read_count("proj/dist/.gitignore"), 0);
    Ok(())
}

#[tokio::test]
async fn blacklist_only_looks_below_the_root() -> TestResult {
    let fs = MockFileSystem::new();
    fs.add_file("build/a.txt", "a");
    let h = harness(&fs, &["build"]);

    let report = h.cycle().await;

    assert_eq!(report.added, files(&[("build/a.txt", "a")]));
    Ok(())
}

#[tokio::test]
async fn os_noise_is_never_tracked() -> TestResult {
    let fs = MockFileSystem::new();
    fs.add_file("proj/keep.txt", "k");
    fs.add_file("proj/.DS_Store", "x");
    fs.add_file("proj/Thumbs.db", "x");
    fs.add_file("proj/._keep.txt", "x");
    fs.add_file("proj/~$report.docx", "x");
    fs.add_file("proj/.keep.txt.crswap", "x");
    fs.add_file("proj/.Trashes/old.txt", "x");
    let h = harness(&fs, &["proj"]);

    let report = h.cycle().await;

    assert_eq!(report.added, files(&[("proj/keep.txt", "k")]));
    assert_eq!(h.fs.list_count("proj/.Trashes"), 0);
    Ok(())
}

#[tokio::test]
async fn gitignore_rules_apply_during_the_walk() -> TestResult {
    let fs = MockFileSystem::new();
    fs.add_file("proj/.gitignore", "# build output\n*.log\n!keep.log\ntmp/\n/root_only.txt\n");
    fs.add_file("proj/a.log", "x");
    fs.add_file("proj/keep.log", "kept");
    fs.add_file("proj/tmp/scratch.txt", "x");
    fs.add_file("proj/root_only.txt", "x");
    fs.add_file("proj/sub/root_only.txt", "nested");
    fs.add_file("proj/sub/tmp", "file named tmp");
    let h = harness(&fs, &["proj"]);

    let report = h.cycle().await;

    let paths: Vec<&str> = report.added.keys().map(String::as_str).collect();
    assert_eq!(
        paths,
        vec!["proj/.gitignore", "proj/keep.log", "proj/sub/root_only.txt", "proj/sub/tmp"]
    );
    assert_eq!(h.fs.list_count("proj/tmp"), 0);
    Ok(())
}

#[tokio::test]
async fn nested_gitignore_only_governs_its_own_subtree() -> TestResult {
    let fs = MockFileSystem::new();
    fs.add_file("proj/a.txt", "a");
    fs.add_file("proj/sub/.gitignore", "*.txt\n");
    fs.add_file("proj/sub/b.txt", "b");
    fs.add_file("proj/sub/c.md", "c");
    let h = harness(&fs, &["proj"]);

    let report = h.cycle().await;

    let paths: Vec<&str> = report.added.keys().map(String::as_str).collect();
    assert_eq!(paths, vec!["proj/a.txt", "proj/sub/.gitignore", "proj/sub/c.md"]);
    Ok(())
}

#[test]
fn ignore_rule_parsing() {
    let rules = [parse_ignore_file(
        "proj",
        "\n# comment\n*.tmp\nout/\n/top.txt\ndocs/*.md\n!docs/keep.md\n",
    )];

    assert_eq!(rule_count(&rules[0]), 5);
    assert!(is_ignored(&rules, "proj/a.tmp", false));
    assert!(is_ignored(&rules, "proj/deep/er/a.tmp", false));
    assert!(is_ignored(&rules, "proj/out", true));
    assert!(!is_ignored(&rules, "proj/out", false), "directory-only rule skips files");
    assert!(is_ignored(&rules, "proj/top.txt", false));
    assert!(!is_ignored(&rules, "proj/sub/top.txt", false), "leading slash anchors");
    assert!(is_ignored(&rules, "proj/docs/a.md", false));
    assert!(!is_ignored(&rules, "proj/docs/nested/a.md", false), "`*` does not cross `/`");
    assert!(!is_ignored(&rules, "proj/docs/keep.md", false), "negation wins when last");
    assert!(!is_ignored(&rules, "other/a.tmp", false), "rules stay under their base");
    assert!(!is_ignored(&rules, "project/a.tmp", false), "base must be a whole segment");
}

#[test]
fn escaped_trailing_space_is_part_of_the_pattern() {
    let rules = [parse_ignore_file("proj", "foo\\ \nbar   \n")];

    assert_eq!(rule_count(&rules[0]), 2);
    assert!(is_ignored(&rules, "proj/foo ", false));
    assert!(!is_ignored(&rules, "proj/foo", false));
    assert!(is_ignored(&rules, "proj/bar", false), "unescaped trailing spaces are trimmed");
}

#[test]
fn deeper_ignore_file_overrides_its_ancestors() {
    let rules = [
        parse_ignore_file("proj/sub", "!keep.log\n"),
        parse_ignore_file("proj", "*.log\n"),
    ];

    assert!(is_ignored(&rules, "proj/a.log", false));
    assert!(is_ignored(&rules, "proj/sub/a.log", false));
    assert!(!is_ignored(&rules, "proj/sub/keep.log", false));
    assert!(is_ignored(&rules, "proj/keep.log", false), "whitelist stays in its subtree");
}

#[tokio::test]
async fn empty_pipeline_includes_everything() -> TestResult {
    let fs = MockFileSystem::new();
    fs.add_file("proj/dist/b.txt", "b");
    fs.add_file("proj/.DS_Store", "x");
    let h = harness_with(&fs, &["proj"], WatchOptions::default(), Some(Vec::new()));

    let report = h.cycle().await;

    assert_eq!(report.added.len(), 2);
    Ok(())
}

#[tokio::test]
async fn exclude_globs_match_root_relative_paths() -> TestResult {
    let fs = MockFileSystem::new();
    fs.add_file("proj/a.txt", "a");
    fs.add_file("proj/a.tmp", "x");
    fs.add_file("proj/gen/out.rs", "x");
    let globs = GlobFilter::new(&["**/*.tmp".to_string(), "gen".to_string()])?;
    let filters: Vec<Arc<dyn FilterFactory>> = vec![Arc::new(StatelessFactory::new("exclude", globs))];
    let h = harness_with(&fs, &["proj"], WatchOptions::default(), Some(filters));

    let report = h.cycle().await;

    assert_eq!(report.added, files(&[("proj/a.txt", "a")]));
    assert_eq!(h.fs.list_count("proj/gen"), 0);
    Ok(())
}

#[derive(Clone)]
struct RejectExtension(&'static str);

impl PathFilter for RejectExtension {
    fn should_include_file<'a>(&'a self, path: &'a str, _file: &'a dyn FileHandle) -> BoxFuture<'a, bool> {
        Box::pin(async move { !path.ends_with(self.0) })
    }

    fn should_process_directory<'a>(&'a self, _path: &'a str, _dir: &'a dyn DirectoryHandle) -> BoxFuture<'a, bool> {
        Box::pin(async { true })
    }
}

#[tokio::test]
async fn closures_work_as_filter_factories() -> TestResult {
    let fs = MockFileSystem::new();
    fs.add_file("proj/a.rs", "a");
    fs.add_file("proj/b.bak", "b");
    let factory = || Box::new(RejectExtension(".bak")) as Box<dyn PathFilter>;
    let filters: Vec<Arc<dyn FilterFactory>> = vec![Arc::new(factory)];
    let h = harness_with(&fs, &["proj"], WatchOptions::default(), Some(filters));

    let report = h.cycle().await;

    assert_eq!(report.added, files(&[("proj/a.rs", "a")]));
    Ok(())
}

#[tokio::test]
async fn every_cycle_gets_fresh_filter_instances() -> TestResult {
    let fs = MockFileSystem::new();
    fs.add_file("proj/a.rs", "a");
    let created = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&created);
    let factory = move || {
        counter.fetch_add(1, Ordering::SeqCst);
        Box::new(RejectExtension(".bak")) as Box<dyn PathFilter>
    };
    let filters: Vec<Arc<dyn FilterFactory>> = vec![Arc::new(factory)];
    let h = harness_with(&fs, &["proj"], WatchOptions::default(), Some(filters));

    h.cycle().await;
    h.cycle().await;
    h.cycle().await;

    assert_eq!(created.load(Ordering::SeqCst), 3);
    Ok(())
}

/// Counts how often it is consulted and always rejects.
struct CountingReject(Arc<AtomicUsize>);

impl PathFilter for CountingReject {
    fn should_include_file<'a>(&'a self, _path: &'a str, _file: &'a dyn FileHandle) -> BoxFuture<'a, bool> {
        self.0.fetch_add(1, Ordering::SeqCst);
        Box::pin(async { false })
    }

    fn should_process_directory<'a>(&'a self, _path: &'a str, _dir: &'a dyn DirectoryHandle) -> BoxFuture<'a, bool> {
        self.0.fetch_add(1, Ordering::SeqCst);
        Box::pin(async { false })
    }
}

#[tokio::test]
async fn pipeline_stops_at_the_first_rejection() -> TestResult {
    let fs = MockFileSystem::new();
    fs.add_file("proj/a.txt", "a");
    let root = fs.directory("proj")?;

    let first = Arc::new(AtomicUsize::new(0));
    let second = Arc::new(AtomicUsize::new(0));
    let pipeline = FilterPipeline::from_filters(vec![
        Box::new(CountingReject(Arc::clone(&first))),
        Box::new(CountingReject(Arc::clone(&second))),
    ]);

    assert!(!pipeline.process_directory("proj", root.as_ref()).await);
    assert_eq!(first.load(Ordering::SeqCst), 1);
    assert_eq!(second.load(Ordering::SeqCst), 0);
    Ok(())
}

#[test]
fn stateless_policies_judge_paths_directly() {
    let blacklist = BlacklistFilter::new(["vendor"]);
    assert!(blacklist.is_blacklisted("proj/vendor/lib.rs"));
    assert!(!blacklist.is_blacklisted("vendor/lib.rs"), "root label is not a segment");
    assert!(!blacklist.is_blacklisted("proj/vendors/lib.rs"));

    assert!(OsNoiseFilter::is_noise_file(".DS_Store"));
    assert!(OsNoiseFilter::is_noise_file(".main.rs.crswap"));
    assert!(!OsNoiseFilter::is_noise_file("main.rs"));
    assert!(OsNoiseFilter::is_noise_directory("System Volume Information"));
}
