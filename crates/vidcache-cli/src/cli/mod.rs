//! CLI for the vidcache preload manager.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::sync::Arc;
use vidcache_core::config;
use vidcache_core::manager::PreloadManager;
use vidcache_core::proxy::DirectProxy;

use commands::{run_clear, run_preload, run_proxy_url, run_remove, run_size};

/// Top-level CLI for the vidcache preload manager.
#[derive(Debug, Parser)]
#[command(name = "vidcache")]
#[command(about = "vidcache: preload manager for a proxying media cache", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Preload a URL into the cache up to a threshold.
    Preload {
        /// Source URL to preload.
        url: String,

        /// Preload threshold in kilobytes (0 = full content).
        #[arg(long, default_value = "0", value_name = "N")]
        kb: u64,

        /// Task identifier (only relevant when scripting several preloads).
        #[arg(long, default_value = "1")]
        id: i64,
    },

    /// Print the playback URL for a source URL.
    ProxyUrl {
        /// Source URL.
        url: String,
    },

    /// Print the aggregate cache size in kilobytes.
    Size,

    /// Remove one URL's cache files (final and in-progress).
    Remove {
        /// Source URL whose cache entry should be removed.
        url: String,
    },

    /// Delete every file in the cache root.
    Clear,
}

pub fn run_from_args() -> Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_or_init()?;
    let root = config::cache_root(&cfg)?;
    let manager = PreloadManager::new(Arc::new(DirectProxy::new(root.clone())), root);

    let result = match cli.command {
        // The command surface takes kilobytes; the core works in bytes.
        CliCommand::Preload { url, kb, id } => run_preload(&manager, id, &url, kb * 1024),
        CliCommand::ProxyUrl { url } => run_proxy_url(&manager, &url),
        CliCommand::Size => run_size(&manager),
        CliCommand::Remove { url } => run_remove(&manager, &url),
        CliCommand::Clear => run_clear(&manager),
    };

    manager.shutdown();
    result
}
