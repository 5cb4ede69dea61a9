//! `vidcache proxy-url <url>` – print the playback URL for a source URL.

use anyhow::Result;
use vidcache_core::manager::PreloadManager;

pub fn run_proxy_url(manager: &PreloadManager, url: &str) -> Result<()> {
    let proxy_url = manager.proxy_url(url)?;
    println!("{proxy_url}");
    Ok(())
}
