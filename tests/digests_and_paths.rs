// tests/digests_and_paths.rs

use std::collections::BTreeSet;

use treewatch::types::FileMap;
use treewatch::watch::diff::classify;
use treewatch::watch::hash::{content_digest, short_digest, snapshot_digest};
use treewatch::watch::path_utils::{file_name, join, relative_to, relative_to_root, split_parent};

fn map(pairs: &[(&str, &str)]) -> FileMap {
    pairs
        .iter()
        .map(|(p, c)| (p.to_string(), c.to_string()))
        .collect()
}

#[test]
fn content_digest_is_blake3_hex() {
    assert_eq!(
        content_digest("hello world"),
        "d74981efa70a0c880b8d8c1985d075dbcbf679b99a5f9914e5aaf96b831a9e24"
    );
    assert_eq!(short_digest("hello world"), "d74981efa70a");
}

#[test]
fn snapshot_digest_depends_on_paths_and_contents() {
    let a = map(&[("r/a", "1"), ("r/b", "2")]);
    let mut b = FileMap::new();
    b.insert("r/b".to_string(), "2".to_string());
    b.insert("r/a".to_string(), "1".to_string());

    assert_eq!(snapshot_digest(&a), snapshot_digest(&b));
    assert_ne!(snapshot_digest(&a), snapshot_digest(&map(&[("r/a", "1"), ("r/b", "3")])));
    assert_ne!(snapshot_digest(&a), snapshot_digest(&map(&[("r/a", "1"), ("r/c", "2")])));
}

#[test]
fn path_label_helpers() {
    assert_eq!(join("proj/src", "a.rs"), "proj/src/a.rs");
    assert_eq!(split_parent("proj/src/a.rs"), Some(("proj/src", "a.rs")));
    assert_eq!(split_parent("proj/a.rs"), Some(("proj", "a.rs")));
    assert_eq!(split_parent("proj"), None);
    assert_eq!(split_parent("/a.rs"), None);
    assert_eq!(relative_to_root("proj/src/a.rs"), "src/a.rs");
    assert_eq!(relative_to_root("proj"), "");
    assert_eq!(relative_to("proj/src", "proj/src/a.rs"), Some("a.rs"));
    assert_eq!(relative_to("proj/src", "proj/srcs/a.rs"), None);
    assert_eq!(file_name("proj/src/a.rs"), "a.rs");
}

#[test]
fn classify_partitions_paths() {
    let previous = map(&[("r/same", "s"), ("r/edit", "old"), ("r/gone", "g"), ("r/broken", "b")]);
    let resolved = map(&[("r/same", "s"), ("r/edit", "new"), ("r/fresh", "f")]);
    let failed: BTreeSet<String> = ["r/broken".to_string(), "r/never".to_string()].into();

    let changes = classify(&previous, &resolved, &failed);

    assert_eq!(changes.added, map(&[("r/fresh", "f")]));
    assert_eq!(changes.changed, map(&[("r/edit", "new")]));
    assert_eq!(changes.deleted, map(&[("r/broken", "b"), ("r/gone", "g")]));
    assert_eq!(changes.len(), 4);
    assert!(!changes.is_empty());
}

#[test]
fn classify_of_identical_states_is_empty() {
    let state = map(&[("r/a", "1")]);
    assert!(classify(&state, &state, &BTreeSet::new()).is_empty());
}
