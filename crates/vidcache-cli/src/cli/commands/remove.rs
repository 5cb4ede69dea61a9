//! `vidcache remove <url>` – remove one URL's cache files.

use anyhow::Result;
use vidcache_core::manager::PreloadManager;

pub fn run_remove(manager: &PreloadManager, url: &str) -> Result<()> {
    manager.remove_cache(url);
    println!("Removed cache entry for {url}");
    Ok(())
}
