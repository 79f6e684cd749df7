// src/watch/cache.rs

use std::collections::HashMap;
use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

#[derive(Debug, Clone)]
struct CacheEntry {
    content: String,
    captured_at: Instant,
}

/// Time-bounded cache of file contents keyed by path label.
///
/// An entry is valid while `now - captured_at < ttl`. Callers pass `now`
/// explicitly so expiry is decided by whoever owns the clock (the engine uses
/// `tokio::time::Instant::now()`, which tests can pause and advance).
#[derive(Debug)]
pub struct ContentCache {
    ttl: Duration,
    entries: HashMap<String, CacheEntry>,
}

impl ContentCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: HashMap::new(),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn is_fresh(&self, entry: &CacheEntry, now: Instant) -> bool {
        now.saturating_duration_since(entry.captured_at) < self.ttl
    }

    /// Cached content for `path` if it is still within the TTL.
    ///
    /// The boolean is the hit flag; it is always `true` when a value is
    /// returned and exists so call sites read like the cache contract.
    pub fn get(&self, path: &str, now: Instant) -> Option<(String, bool)> {
        match self.entries.get(path) {
            Some(entry) if self.is_fresh(entry, now) => Some((entry.content.clone(), true)),
            Some(_) => {
                debug!(path, "cache entry expired");
                None
            }
            None => None,
        }
    }

    /// Content for `path` regardless of age.
    pub fn peek(&self, path: &str) -> Option<&str> {
        self.entries.get(path).map(|e| e.content.as_str())
    }

    pub fn put(&mut self, path: &str, content: String, now: Instant) {
        self.entries.insert(
            path.to_string(),
            CacheEntry {
                content,
                captured_at: now,
            },
        );
    }

    pub fn remove(&mut self, path: &str) {
        if self.entries.remove(path).is_some() {
            debug!(path, "evicted cache entry");
        }
    }

    /// Drop every entry older than the TTL. Returns how many were dropped.
    pub fn evict_expired(&mut self, now: Instant) -> usize {
        let before = self.entries.len();
        let ttl = self.ttl;
        self.entries
            .retain(|_, entry| now.saturating_duration_since(entry.captured_at) < ttl);
        let evicted = before - self.entries.len();
        if evicted > 0 {
            debug!(evicted, "purged expired cache entries");
        }
        evicted
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
