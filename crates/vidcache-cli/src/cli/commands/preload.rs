//! `vidcache preload <url> [--kb N]` – run one preload to completion.

use anyhow::{Context, Result};
use vidcache_core::manager::{PreloadManager, PreloadStart};
use vidcache_core::task::PreloadOutcome;

/// Starts a preload and blocks until its terminal outcome, printing the
/// outcome label. A failed download exits nonzero.
pub fn run_preload(manager: &PreloadManager, id: i64, url: &str, threshold_bytes: u64) -> Result<()> {
    let outcome = match manager.start_preload(id, url, threshold_bytes)? {
        PreloadStart::Done(outcome) => {
            tracing::debug!(url, "already satisfied from cache state");
            outcome
        }
        PreloadStart::Started(rx) => rx.recv().context("preload task dropped its result")?,
    };

    match outcome {
        PreloadOutcome::Failed(e) => Err(e.into()),
        other => {
            println!("{}", other.label());
            Ok(())
        }
    }
}
