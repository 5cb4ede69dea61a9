//! Collaborator seam for the proxying cache server.
//!
//! The proxy server itself (range serving, multi-reader coordination, the
//! cache write path) is a separate process. This module owns only what the
//! preload core consumes from it: the proxy-URL lookup, the cache-file
//! naming convention, and the in-progress-file suffix.

use std::path::{Path, PathBuf};

use anyhow::Result;
use sha2::{Digest, Sha256};
use url::Url;

/// Suffix the cache layer appends to a final path while a download is in
/// progress (`video.bin` → `video.bin.download`).
pub const TEMP_SUFFIX: &str = ".download";

/// Access to the external proxy cache server.
pub trait ProxyServer: Send + Sync {
    /// Locally-servable URL a player (or a preload task) should fetch
    /// instead of `url`.
    fn proxy_url(&self, url: &str) -> Result<String>;

    /// Path of the complete cache file for `url`. The file may not exist.
    fn cache_file(&self, url: &str) -> PathBuf;
}

/// Path of the in-progress download file: the final path with
/// [`TEMP_SUFFIX`] appended.
pub fn temp_path(final_path: &Path) -> PathBuf {
    let mut o = final_path.as_os_str().to_owned();
    o.push(TEMP_SUFFIX);
    PathBuf::from(o)
}

/// A resource plus the two cache paths the collaborator derives for it.
/// Immutable once resolved.
#[derive(Debug, Clone)]
pub struct ResourceRef {
    pub url: String,
    pub final_path: PathBuf,
    pub temp_path: PathBuf,
}

impl ResourceRef {
    /// Resolves the cache paths for `url` through the collaborator.
    pub fn resolve(proxy: &dyn ProxyServer, url: &str) -> Self {
        let final_path = proxy.cache_file(url);
        let temp_path = temp_path(&final_path);
        Self {
            url: url.to_string(),
            final_path,
            temp_path,
        }
    }
}

/// Stable cache file name for a URL: the `_l` query parameter when present
/// (so rotating CDN hosts share one cache entry), else the whole URL,
/// hashed to lowercase hex.
pub fn cache_name(url: &str) -> String {
    let key = Url::parse(url)
        .ok()
        .and_then(|u| {
            u.query_pairs()
                .find(|(k, _)| k == "_l")
                .map(|(_, v)| v.into_owned())
        })
        .unwrap_or_else(|| url.to_string());
    hex::encode(Sha256::digest(key.as_bytes()))
}

/// Passthrough proxy: resources are fetched from their origin URL and cache
/// files live under `cache_root`. Used by the CLI and tests; a production
/// deployment points [`ProxyServer`] at the real proxy process instead.
pub struct DirectProxy {
    cache_root: PathBuf,
}

impl DirectProxy {
    pub fn new(cache_root: PathBuf) -> Self {
        Self { cache_root }
    }
}

impl ProxyServer for DirectProxy {
    fn proxy_url(&self, url: &str) -> Result<String> {
        Ok(url.to_string())
    }

    fn cache_file(&self, url: &str) -> PathBuf {
        self.cache_root.join(cache_name(url))
    }
}
