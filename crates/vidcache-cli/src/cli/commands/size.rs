//! `vidcache size` – print the aggregate cache size in kilobytes.

use anyhow::{Context, Result};
use vidcache_core::manager::PreloadManager;

pub fn run_size(manager: &PreloadManager) -> Result<()> {
    let kb = manager
        .cache_size()
        .recv()
        .context("cache size worker dropped its result")??;
    println!("{kb} KB");
    Ok(())
}
