use blake3::Hasher;

use crate::types::FileMap;

/// Number of hex characters shown by [`short_digest`].
pub const SHORT_DIGEST_LEN: usize = 12;

/// blake3 hex digest of a file's content.
pub fn content_digest(content: &str) -> String {
    blake3::hash(content.as_bytes()).to_hex().to_string()
}

/// Abbreviated digest used in human-facing output.
pub fn short_digest(content: &str) -> String {
    let mut digest = content_digest(content);
    digest.truncate(SHORT_DIGEST_LEN);
    digest
}

/// Deterministic digest over a whole snapshot (paths and contents).
///
/// `FileMap` is ordered, so two snapshots with identical entries always hash
/// the same.
pub fn snapshot_digest(files: &FileMap) -> String {
    let mut hasher = Hasher::new();
    for (path, content) in files {
        hasher.update(path.as_bytes());
        hasher.update(&[0]);
        hasher.update(content_digest(content).as_bytes());
        hasher.update(&[b'\n']);
    }
    hasher.finalize().to_hex().to_string()
}
