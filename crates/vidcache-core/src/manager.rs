//! Facade composing the probe, the registry, and the worker lane.
//!
//! Start requests probe on-disk state first and only reach the executor
//! when a download is actually needed. Every started task resolves to
//! exactly one terminal outcome, delivered over a channel.

use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;

use crate::error::PreloadError;
use crate::executor::SerialExecutor;
use crate::maintenance;
use crate::probe::{self, ProbeResult};
use crate::proxy::{ProxyServer, ResourceRef};
use crate::registry::TaskRegistry;
use crate::task::{PreloadOutcome, PreloadTask};

/// Result of a start request: resolved immediately from cache state, or
/// pending on a background task.
#[derive(Debug)]
pub enum PreloadStart {
    /// The probe found the request already satisfied.
    Done(PreloadOutcome),
    /// A task was registered and queued; its terminal outcome arrives on
    /// the channel, exactly once.
    Started(Receiver<PreloadOutcome>),
}

pub struct PreloadManager {
    proxy: Arc<dyn ProxyServer>,
    cache_root: PathBuf,
    registry: Arc<TaskRegistry>,
    executor: SerialExecutor,
}

impl PreloadManager {
    pub fn new(proxy: Arc<dyn ProxyServer>, cache_root: PathBuf) -> Self {
        Self {
            proxy,
            cache_root,
            registry: Arc::new(TaskRegistry::new()),
            executor: SerialExecutor::new(),
        }
    }

    /// Starts (or short-circuits) a preload of `url` up to `threshold_bytes`
    /// (0 = full content), keyed by the caller-chosen `id`.
    ///
    /// Empty URLs and ids that are still active are rejected synchronously;
    /// everything else resolves through [`PreloadStart`].
    pub fn start_preload(
        &self,
        id: i64,
        url: &str,
        threshold_bytes: u64,
    ) -> Result<PreloadStart, PreloadError> {
        if url.is_empty() {
            return Err(PreloadError::InvalidArgument);
        }

        let resource = ResourceRef::resolve(self.proxy.as_ref(), url);
        match probe::probe(&resource, threshold_bytes) {
            ProbeResult::Cached => return Ok(PreloadStart::Done(PreloadOutcome::Cached)),
            ProbeResult::Preloaded => return Ok(PreloadStart::Done(PreloadOutcome::Preloaded)),
            ProbeResult::Unsatisfied => {}
        }

        let task = Arc::new(PreloadTask::new(
            Arc::clone(&self.proxy),
            resource,
            threshold_bytes,
        ));
        self.registry.put(id, Arc::clone(&task))?;

        let (tx, rx) = mpsc::channel();
        let registry = Arc::clone(&self.registry);
        let submitted = self.executor.submit(move || {
            let outcome = task.run();
            // Terminal state: leave the registry before reporting. A racing
            // stop request may already have removed the id; the removal is
            // an idempotent no-op then.
            registry.remove(id);
            tracing::debug!(id, outcome = outcome.label(), "preload finished");
            let _ = tx.send(outcome);
        });
        if let Err(e) = submitted {
            self.registry.remove(id);
            return Err(e);
        }

        tracing::debug!(id, url, threshold_bytes, "preload queued");
        Ok(PreloadStart::Started(rx))
    }

    /// Cancels the preload under `id`; unknown ids are a no-op. The task is
    /// removed from the registry before the cancel request so a second stop
    /// or a racing completion cannot double-report.
    pub fn stop_preload(&self, id: i64) {
        if let Some(task) = self.registry.remove(id) {
            task.request_cancel();
        }
    }

    /// Cancels every active preload: drains the registry in one sweep and
    /// requests cancellation on each removed task. Best-effort and
    /// infallible; a cancel request is an atomic store and cannot fail, so
    /// no single task can abort the sweep.
    pub fn stop_all(&self) {
        for (id, task) in self.registry.drain() {
            tracing::debug!(id, "cancel requested");
            task.request_cancel();
        }
    }

    /// Number of preloads currently registered (pending or running).
    pub fn active_tasks(&self) -> usize {
        self.registry.len()
    }

    /// Playback URL for `url` through the proxy collaborator.
    pub fn proxy_url(&self, url: &str) -> Result<String, PreloadError> {
        if url.is_empty() {
            return Err(PreloadError::InvalidArgument);
        }
        self.proxy.proxy_url(url).map_err(PreloadError::Network)
    }

    /// Aggregate cache size in kilobytes, computed off this thread.
    pub fn cache_size(&self) -> Receiver<anyhow::Result<u64>> {
        maintenance::spawn_cache_size(self.cache_root.clone())
    }

    /// Deletes the cached data (final and in-progress files) for one URL.
    /// Silently no-ops on empty URLs and missing files.
    pub fn remove_cache(&self, url: &str) {
        if url.is_empty() {
            return;
        }
        let resource = ResourceRef::resolve(self.proxy.as_ref(), url);
        maintenance::remove_resource(&resource);
    }

    /// Clears the whole cache root, off this thread.
    pub fn clear_cache(&self) -> Receiver<anyhow::Result<()>> {
        maintenance::spawn_clear_cache(self.cache_root.clone())
    }

    /// Cancels all tasks and stops the worker lane; further start requests
    /// fail with `NotAcceptingWork`. In-flight downloads notice the cancel
    /// flag at their next chunk check, so shutdown can take up to one read
    /// timeout.
    pub fn shutdown(&self) {
        self.stop_all();
        self.executor.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proxy::DirectProxy;

    fn manager_in(dir: &std::path::Path) -> PreloadManager {
        PreloadManager::new(
            Arc::new(DirectProxy::new(dir.to_path_buf())),
            dir.to_path_buf(),
        )
    }

    #[test]
    fn empty_url_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager_in(dir.path());
        assert!(matches!(
            manager.start_preload(1, "", 0),
            Err(PreloadError::InvalidArgument)
        ));
        assert!(matches!(
            manager.proxy_url(""),
            Err(PreloadError::InvalidArgument)
        ));
        assert_eq!(manager.active_tasks(), 0);
    }

    #[test]
    fn stop_of_unknown_id_is_a_noop() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager_in(dir.path());
        manager.stop_preload(42);
        manager.stop_all();
        assert_eq!(manager.active_tasks(), 0);
    }

    #[test]
    fn remove_cache_ignores_empty_url_and_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager_in(dir.path());
        manager.remove_cache("");
        manager.remove_cache("http://example.com/never-fetched.mp4");
    }

    #[test]
    fn start_after_shutdown_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager_in(dir.path());
        manager.shutdown();
        let err = manager
            .start_preload(1, "http://127.0.0.1:9/v.mp4", 0)
            .unwrap_err();
        assert!(matches!(err, PreloadError::NotAcceptingWork));
        assert_eq!(manager.active_tasks(), 0, "rejected task must not linger");
    }
}
