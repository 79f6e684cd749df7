// src/errors.rs

//! Crate-wide error type and result alias.
//!
//! Scan and read failures never show up here: they are contained inside a
//! poll cycle and reclassified as deletions. What does surface is what a
//! caller of a mutation or of `select_root` needs to react to.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum WatchError {
    /// The directory picker was cancelled or access was denied.
    #[error("directory access declined: {0}")]
    PermissionDeclined(String),

    /// A mutation targeted a path with no tracked handle (and creation was
    /// not permitted), or its parent directory is not under watch.
    #[error("not found: {0}")]
    NotFound(String),

    /// The write transaction for `path` failed and was aborted.
    #[error("write failed for {path}: {source}")]
    WriteFailure {
        path: String,
        #[source]
        source: anyhow::Error,
    },

    /// Removing `path` through its parent directory failed.
    #[error("remove failed for {path}: {source}")]
    RemoveFailure {
        path: String,
        #[source]
        source: anyhow::Error,
    },

    /// No directory picker capability is available on this platform.
    #[error("file system access is not supported on this platform")]
    UnsupportedPlatform,

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, WatchError>;
