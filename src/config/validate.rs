// src/config/validate.rs

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{Result, WatchError};
use crate::watch::patterns::build_globset;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = WatchError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.watch, raw.filters))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_watch_section(cfg)?;
    validate_filters_section(cfg)?;
    Ok(())
}

fn validate_watch_section(cfg: &RawConfigFile) -> Result<()> {
    if cfg.watch.poll_interval_ms == 0 {
        return Err(WatchError::ConfigError(
            "[watch].poll_interval_ms must be >= 1 (got 0)".to_string(),
        ));
    }
    if cfg.watch.batch_size == 0 {
        return Err(WatchError::ConfigError(
            "[watch].batch_size must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

fn validate_filters_section(cfg: &RawConfigFile) -> Result<()> {
    if let Some(fragments) = &cfg.filters.blacklist_fragments {
        if let Some(bad) = fragments.iter().find(|f| f.is_empty() || f.contains('/')) {
            return Err(WatchError::ConfigError(format!(
                "[filters].blacklist_fragments entries must be single path segments (got '{bad}')"
            )));
        }
    }
    build_globset(&cfg.filters.exclude)
        .map_err(|err| WatchError::ConfigError(format!("[filters].exclude: {err:#}")))?;
    Ok(())
}
