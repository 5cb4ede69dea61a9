//! `vidcache clear` – delete every file in the cache root.

use anyhow::{Context, Result};
use vidcache_core::manager::PreloadManager;

pub fn run_clear(manager: &PreloadManager) -> Result<()> {
    manager
        .clear_cache()
        .recv()
        .context("cache clear worker dropped its result")??;
    println!("Cache cleared");
    Ok(())
}
