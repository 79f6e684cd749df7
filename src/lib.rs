// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod fs;
pub mod logging;
pub mod types;
pub mod watch;

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::config::loader::{default_config_path, load_and_validate, load_or_default};
use crate::config::model::ConfigFile;
use crate::engine::{CycleOutcome, EngineBuilder, WatchEngine};
use crate::fs::local::LocalPicker;
use crate::types::FileMap;
use crate::watch::hash::{short_digest, snapshot_digest};

pub use crate::engine::{CycleReport, Observers};
pub use crate::errors::WatchError;
pub use crate::types::{WatchOptions, WriteOptions};

/// High-level entry point used by `main.rs`.
///
/// Loads the config, grants every `DIR` through a [`LocalPicker`], then
/// either runs one cycle (`--once`) or polls until Ctrl-C.
pub async fn run(args: CliArgs) -> Result<()> {
    let cfg = load_config(&args)?;

    if args.dry_run {
        print_dry_run(&cfg, &args);
        return Ok(());
    }

    let picker = Arc::new(LocalPicker::new(args.dirs.iter().cloned()));
    let engine = EngineBuilder::new()
        .options(cfg.watch_options())
        .filters(cfg.filter_factories()?)
        .picker(picker)
        .autostart(!args.once)
        .on_files_added(|delta, _| print_events("added", delta))
        .on_files_changed(|delta, _| print_events("changed", delta))
        .on_files_deleted(|delta, _| print_events("deleted", delta))
        .build();

    for dir in &args.dirs {
        engine
            .select_root()
            .await
            .with_context(|| format!("cannot watch {}", dir.display()))?;
    }

    if args.once {
        return run_once(&engine).await;
    }

    info!(roots = ?engine.roots(), "watching; press Ctrl-C to stop");
    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl-C")?;

    let stats = engine.stats();
    engine.clear();
    info!(
        cycles = stats.cycles_completed,
        skipped_ticks = stats.skipped_ticks,
        "shutting down"
    );
    Ok(())
}

fn load_config(args: &CliArgs) -> Result<ConfigFile> {
    let mut cfg = match &args.config {
        Some(path) => load_and_validate(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => load_or_default(default_config_path()).context("loading treewatch.toml")?,
    };
    if let Some(ms) = args.poll_interval_ms {
        debug!(poll_interval_ms = ms, "poll interval overridden on the command line");
        cfg.watch.poll_interval_ms = ms;
    }
    Ok(cfg)
}

async fn run_once(engine: &WatchEngine) -> Result<()> {
    match engine.run_cycle().await {
        CycleOutcome::Completed(report) => {
            for (path, content) in report.snapshot.iter() {
                println!("{path} {}", short_digest(content));
            }
            info!(
                files = report.snapshot.len(),
                digest = %snapshot_digest(&report.snapshot),
                "scan complete"
            );
        }
        other => warn!(?other, "scan did not complete"),
    }
    engine.clear();
    Ok(())
}

/// One stdout line per path: `<kind> <path> <digest>`.
pub fn format_event(kind: &str, path: &str, content: &str) -> String {
    format!("{kind} {path} {}", short_digest(content))
}

fn print_events(kind: &str, delta: &FileMap) {
    for (path, content) in delta {
        println!("{}", format_event(kind, path, content));
    }
}

fn print_dry_run(cfg: &ConfigFile, args: &CliArgs) {
    println!("treewatch dry-run");
    println!("  roots:");
    for dir in &args.dirs {
        println!("    - {}", dir.display());
    }
    println!("  [watch]");
    println!("    poll_interval_ms = {}", cfg.watch.poll_interval_ms);
    println!("    batch_size = {}", cfg.watch.batch_size);
    println!("    debounce_interval_ms = {}", cfg.watch.debounce_interval_ms);
    println!("    file_cache_ttl_ms = {}", cfg.watch.file_cache_ttl_ms);
    println!("  [filters]");
    println!("    ignore_files = {}", cfg.filters.ignore_files);
    println!("    blacklist = {}", cfg.filters.blacklist);
    println!("    os_noise = {}", cfg.filters.os_noise);
    if let Some(ref fragments) = cfg.filters.blacklist_fragments {
        println!("    blacklist_fragments = {:?}", fragments);
    }
    if !cfg.filters.exclude.is_empty() {
        println!("    exclude = {:?}", cfg.filters.exclude);
    }

    debug!("dry-run complete (nothing watched)");
}
