// src/watch/path_utils.rs

//! Helpers for the `/`-joined path labels used throughout the engine.

/// Join a parent label and a child name.
pub fn join(parent: &str, name: &str) -> String {
    format!("{parent}/{name}")
}

/// Split a label into `(parent, leaf)`.
///
/// Returns `None` for labels without a parent (a bare root name) or with an
/// empty leaf.
pub fn split_parent(path: &str) -> Option<(&str, &str)> {
    let path = path.trim_end_matches('/');
    match path.rsplit_once('/') {
        Some((parent, leaf)) if !parent.is_empty() && !leaf.is_empty() => Some((parent, leaf)),
        _ => None,
    }
}

/// The label relative to its root, i.e. with the first segment removed.
///
/// `"proj/src/main.rs"` → `"src/main.rs"`; a bare root label yields `""`.
pub fn relative_to_root(path: &str) -> &str {
    path.split_once('/').map(|(_, rest)| rest).unwrap_or("")
}

/// Path relative to `base`, if `path` lies strictly beneath it.
pub fn relative_to<'a>(base: &str, path: &'a str) -> Option<&'a str> {
    path.strip_prefix(base)?.strip_prefix('/')
}

/// Final segment of a label.
pub fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}
