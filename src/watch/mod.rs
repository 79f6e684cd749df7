// src/watch/mod.rs

//! Scanning and change detection.
//!
//! This module is responsible for:
//! - The exclusion policy pipeline and the built-in policies.
//! - Walking the watched roots into a path → handle map.
//! - The time-bounded content cache.
//! - Classifying a cycle's reads into added / changed / deleted.
//!
//! It does **not** own any engine state or timers; the engine drives it.

pub mod cache;
pub mod diff;
pub mod filters;
pub mod hash;
pub mod ignore_rules;
pub mod path_utils;
pub mod patterns;
pub mod scanner;

pub use cache::ContentCache;
pub use diff::{ChangeSet, classify};
pub use filters::{FilterFactory, FilterPipeline, PathFilter, StatelessFactory, default_filters};
pub use ignore_rules::IgnoreRulesFilter;
pub use patterns::{BlacklistFilter, GlobFilter, OsNoiseFilter};
pub use scanner::{ScanResult, scan_roots};
