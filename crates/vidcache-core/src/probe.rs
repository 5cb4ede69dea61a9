//! Cache-state probe: decide whether a preload request is already satisfied
//! by on-disk state, without touching the network.

use std::fs;
use std::path::Path;

use crate::proxy::ResourceRef;

/// A final cache file shorter than this is treated as a truncated artifact
/// of an earlier failed download and deleted.
pub const MIN_FINAL_BYTES: u64 = 1024;

/// Outcome of a cache probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeResult {
    /// Complete cache file present; nothing to download.
    Cached,
    /// The partial file already holds at least the requested threshold.
    Preloaded,
    /// Existing state does not satisfy the request; a task is needed.
    Unsatisfied,
}

/// Probes on-disk state for `resource` against `threshold_bytes`
/// (0 = full content required).
///
/// Reads fresh filesystem metadata on every call; the only side effect is
/// deleting a final file shorter than [`MIN_FINAL_BYTES`]. Safe to call
/// while a download of the same resource is in flight: a race yields a
/// conservative `Unsatisfied` and at worst one redundant task.
pub fn probe(resource: &ResourceRef, threshold_bytes: u64) -> ProbeResult {
    if let Some(len) = file_len(&resource.final_path) {
        if len >= MIN_FINAL_BYTES {
            return ProbeResult::Cached;
        }
        // Truncated leftover from an earlier failed download.
        if let Err(e) = fs::remove_file(&resource.final_path) {
            tracing::warn!(
                path = %resource.final_path.display(),
                "could not delete truncated cache file: {}",
                e
            );
        }
    }

    // A full-content preload is never satisfied by a partial file.
    if threshold_bytes == 0 {
        return ProbeResult::Unsatisfied;
    }

    match file_len(&resource.temp_path) {
        Some(len) if len >= threshold_bytes => ProbeResult::Preloaded,
        _ => ProbeResult::Unsatisfied,
    }
}

fn file_len(path: &Path) -> Option<u64> {
    fs::metadata(path)
        .ok()
        .filter(|m| m.is_file())
        .map(|m| m.len())
}
