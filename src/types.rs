use std::collections::BTreeMap;
use std::time::Duration;

/// Path label → file content.
///
/// Keys are `/`-joined labels that start with the watched root's name, e.g.
/// `"project/src/main.rs"`. Ordered so that listings and test assertions are
/// deterministic.
pub type FileMap = BTreeMap<String, String>;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);
pub const DEFAULT_BATCH_SIZE: usize = 50;
pub const DEFAULT_DEBOUNCE_INTERVAL: Duration = Duration::from_millis(50);
pub const DEFAULT_FILE_CACHE_TTL: Duration = Duration::from_millis(5000);

/// Timing and batching knobs for a [`crate::engine::WatchEngine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchOptions {
    /// How often the poll scheduler starts a scan cycle.
    pub poll_interval: Duration,
    /// Maximum number of concurrent reads within one batch.
    pub batch_size: usize,
    /// Quiet period before the observable snapshot catches up.
    pub debounce_interval: Duration,
    /// How long a cached file content is trusted without re-reading.
    pub file_cache_ttl: Duration,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            batch_size: DEFAULT_BATCH_SIZE,
            debounce_interval: DEFAULT_DEBOUNCE_INTERVAL,
            file_cache_ttl: DEFAULT_FILE_CACHE_TTL,
        }
    }
}

impl WatchOptions {
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// A batch size of zero is treated as one.
    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size.max(1);
        self
    }

    pub fn with_debounce_interval(mut self, interval: Duration) -> Self {
        self.debounce_interval = interval;
        self
    }

    pub fn with_file_cache_ttl(mut self, ttl: Duration) -> Self {
        self.file_cache_ttl = ttl;
        self
    }
}

/// Options for [`crate::engine::WatchEngine::write_file`].
///
/// - `create`: lazily create the file when no handle is tracked for it.
/// - `truncate`: start the write from an empty file. When false, the staged
///   write starts from the existing bytes and overwrites them from offset 0,
///   so bytes past the end of the new data survive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteOptions {
    pub create: bool,
    pub truncate: bool,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            create: true,
            truncate: false,
        }
    }
}
