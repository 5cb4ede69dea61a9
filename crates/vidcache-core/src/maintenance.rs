//! Cache maintenance: aggregate size and bulk delete, off the caller's
//! thread.
//!
//! Both walk the cache root's direct children only; subdirectories are
//! neither summed nor descended into (the cache layer keeps a flat root).

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver};
use std::thread;

use anyhow::{Context, Result};

use crate::proxy::ResourceRef;

/// Total size of the regular files directly under `root`, rounded to the
/// nearest kilobyte. A missing root counts as empty.
pub fn cache_size_kb(root: &Path) -> Result<u64> {
    let entries = match fs::read_dir(root) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
        Err(e) => {
            return Err(e).with_context(|| format!("read cache dir {}", root.display()));
        }
    };

    let mut bytes: u64 = 0;
    for entry in entries {
        let entry = entry.with_context(|| format!("read cache dir {}", root.display()))?;
        let meta = entry
            .metadata()
            .with_context(|| format!("stat {}", entry.path().display()))?;
        if meta.is_file() {
            bytes += meta.len();
        }
    }
    Ok((bytes + 512) / 1024)
}

/// Deletes every regular file directly under `root`, stopping at the first
/// deletion failure rather than continuing best-effort. A missing root is
/// already clear.
pub fn clear_cache(root: &Path) -> Result<()> {
    let entries = match fs::read_dir(root) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => {
            return Err(e).with_context(|| format!("read cache dir {}", root.display()));
        }
    };

    for entry in entries {
        let entry = entry.with_context(|| format!("read cache dir {}", root.display()))?;
        let meta = entry
            .metadata()
            .with_context(|| format!("stat {}", entry.path().display()))?;
        if meta.is_file() {
            let path = entry.path();
            fs::remove_file(&path)
                .with_context(|| format!("delete cache file {}", path.display()))?;
            tracing::debug!(path = %path.display(), "deleted cache file");
        }
    }
    Ok(())
}

/// Deletes the final and in-progress cache files for one resource.
/// Missing files are not an error.
pub fn remove_resource(resource: &ResourceRef) {
    for path in [&resource.final_path, &resource.temp_path] {
        match fs::remove_file(path) {
            Ok(()) => tracing::debug!(path = %path.display(), "deleted cache file"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(path = %path.display(), "could not delete cache file: {}", e)
            }
        }
    }
}

/// Runs [`cache_size_kb`] on a background thread. The result (or error)
/// arrives on the returned channel, so callers keep an error path without
/// blocking the registry or the worker lane.
pub fn spawn_cache_size(root: PathBuf) -> Receiver<Result<u64>> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let _ = tx.send(cache_size_kb(&root));
    });
    rx
}

/// Runs [`clear_cache`] on a background thread, reporting completion over
/// the returned channel.
pub fn spawn_clear_cache(root: PathBuf) -> Receiver<Result<()>> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let _ = tx.send(clear_cache(&root));
    });
    rx
}
