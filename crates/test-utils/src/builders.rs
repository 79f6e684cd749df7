#![allow(dead_code)]

use treewatch::config::{ConfigFile, FiltersSection, RawConfigFile, WatchSection};

/// Builder for `ConfigFile` to simplify test setup.
///
/// Starts from the defaults of every section; `build` runs the same
/// validation as loading from disk.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                watch: WatchSection::default(),
                filters: FiltersSection::default(),
            },
        }
    }

    pub fn poll_interval_ms(mut self, ms: u64) -> Self {
        self.config.watch.poll_interval_ms = ms;
        self
    }

    pub fn batch_size(mut self, size: usize) -> Self {
        self.config.watch.batch_size = size;
        self
    }

    pub fn debounce_interval_ms(mut self, ms: u64) -> Self {
        self.config.watch.debounce_interval_ms = ms;
        self
    }

    pub fn file_cache_ttl_ms(mut self, ms: u64) -> Self {
        self.config.watch.file_cache_ttl_ms = ms;
        self
    }

    pub fn ignore_files(mut self, enabled: bool) -> Self {
        self.config.filters.ignore_files = enabled;
        self
    }

    pub fn blacklist(mut self, enabled: bool) -> Self {
        self.config.filters.blacklist = enabled;
        self
    }

    pub fn os_noise(mut self, enabled: bool) -> Self {
        self.config.filters.os_noise = enabled;
        self
    }

    pub fn with_blacklist_fragment(mut self, fragment: &str) -> Self {
        self.config
            .filters
            .blacklist_fragments
            .get_or_insert_with(Vec::new)
            .push(fragment.to_string());
        self
    }

    pub fn with_exclude(mut self, pattern: &str) -> Self {
        self.config.filters.exclude.push(pattern.to_string());
        self
    }

    /// The raw, unvalidated configuration.
    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}
