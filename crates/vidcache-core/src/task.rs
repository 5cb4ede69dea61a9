//! A single bounded preload download.
//!
//! Streams the resource's proxy URL in 8 KiB chunks while counting delivered
//! bytes; after each chunk the cancel flag and the byte threshold are
//! checked and the transfer is aborted once either is hit. Exactly one
//! terminal outcome is produced per task, on every exit path.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::anyhow;

use crate::error::PreloadError;
use crate::maintenance;
use crate::proxy::{ProxyServer, ResourceRef};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
/// Read stall timeout: the transfer is dropped when it delivers less than
/// one byte per second for this long.
const READ_TIMEOUT: Duration = Duration::from_secs(5);
/// Transfer buffer size; also the granularity of cancel/threshold checks,
/// which bounds how late a cancellation is noticed on a live stream.
const CHUNK_SIZE: usize = 8 * 1024;

/// Lifecycle of a preload task. `Pending` and `Running` are transient; the
/// other four are terminal and imply the task has left the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Pending,
    Running,
    Completed,
    PartiallyLoaded,
    Canceled,
    Failed,
}

/// Terminal outcome delivered to the caller, exactly once per task.
#[derive(Debug)]
pub enum PreloadOutcome {
    /// Full content reached the cache (natural end of stream), or the probe
    /// found a complete cache file.
    Cached,
    /// The byte threshold was reached, or a partial file already held it.
    Preloaded,
    Canceled,
    Failed(PreloadError),
}

impl PreloadOutcome {
    /// Label reported over the command surface
    /// (`cached` / `preloaded` / `canceled` / `failed`).
    pub fn label(&self) -> &'static str {
        match self {
            PreloadOutcome::Cached => "cached",
            PreloadOutcome::Preloaded => "preloaded",
            PreloadOutcome::Canceled => "canceled",
            PreloadOutcome::Failed(_) => "failed",
        }
    }
}

/// One background download bounded by a byte threshold.
pub struct PreloadTask {
    resource: ResourceRef,
    threshold_bytes: u64,
    proxy: Arc<dyn ProxyServer>,
    cancel: AtomicBool,
    state: Mutex<TaskState>,
}

impl PreloadTask {
    pub fn new(proxy: Arc<dyn ProxyServer>, resource: ResourceRef, threshold_bytes: u64) -> Self {
        Self {
            resource,
            threshold_bytes,
            proxy,
            cancel: AtomicBool::new(false),
            state: Mutex::new(TaskState::Pending),
        }
    }

    pub fn resource(&self) -> &ResourceRef {
        &self.resource
    }

    pub fn state(&self) -> TaskState {
        *self.state.lock().unwrap()
    }

    /// Requests cooperative cancellation. Idempotent, callable from any
    /// thread. The running download notices the flag at its next chunk
    /// check; a transfer blocked on I/O may take up to the read timeout.
    pub fn request_cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    pub fn cancel_requested(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }

    /// Runs the download to a terminal outcome. Invoked once, on the
    /// executor's worker lane.
    pub fn run(&self) -> PreloadOutcome {
        self.set_state(TaskState::Running);
        let outcome = self.fetch();
        self.set_state(match &outcome {
            PreloadOutcome::Cached => TaskState::Completed,
            PreloadOutcome::Preloaded => TaskState::PartiallyLoaded,
            PreloadOutcome::Canceled => TaskState::Canceled,
            PreloadOutcome::Failed(_) => TaskState::Failed,
        });
        outcome
    }

    fn set_state(&self, state: TaskState) {
        *self.state.lock().unwrap() = state;
    }

    fn fetch(&self) -> PreloadOutcome {
        // A task canceled while still queued is dequeued and run; it reports
        // instead of being silently dropped.
        if self.cancel_requested() {
            return PreloadOutcome::Canceled;
        }

        let proxy_url = match self.proxy.proxy_url(&self.resource.url) {
            Ok(u) => u,
            Err(e) => return PreloadOutcome::Failed(PreloadError::Network(e)),
        };

        let bytes_read = Arc::new(AtomicU64::new(0));
        let break_load = Arc::new(AtomicBool::new(false));
        if let Err(e) = self.stream(&proxy_url, &bytes_read, &break_load) {
            return PreloadOutcome::Failed(e);
        }

        if break_load.load(Ordering::Relaxed) {
            // Early exit from the chunk check; cancellation wins over the
            // threshold when both are set.
            return if self.cancel_requested() {
                PreloadOutcome::Canceled
            } else {
                PreloadOutcome::Preloaded
            };
        }

        if bytes_read.load(Ordering::Relaxed) == 0 {
            // Cancellation can land before the first byte; don't turn that
            // into a failure.
            if self.cancel_requested() {
                return PreloadOutcome::Canceled;
            }
            tracing::warn!(url = %self.resource.url, "stream ended without data");
            maintenance::remove_resource(&self.resource);
            return PreloadOutcome::Failed(PreloadError::EmptyStream);
        }

        PreloadOutcome::Cached
    }

    /// Streams `proxy_url`, counting delivered bytes into `bytes_read`.
    /// The per-chunk check aborts the transfer (marking `break_load`) once
    /// the cancel flag or the threshold is hit. The connection is released
    /// when the curl handle drops, on every exit path.
    fn stream(
        &self,
        proxy_url: &str,
        bytes_read: &Arc<AtomicU64>,
        break_load: &Arc<AtomicBool>,
    ) -> Result<(), PreloadError> {
        let threshold = self.threshold_bytes;
        let bytes_cb = Arc::clone(bytes_read);
        let break_cb = Arc::clone(break_load);

        let mut easy = curl::easy::Easy::new();
        easy.url(proxy_url).map_err(net)?;
        easy.follow_location(true).map_err(net)?;
        easy.connect_timeout(CONNECT_TIMEOUT).map_err(net)?;
        easy.low_speed_limit(1).map_err(net)?;
        easy.low_speed_time(READ_TIMEOUT).map_err(net)?;
        easy.buffer_size(CHUNK_SIZE).map_err(net)?;

        {
            let mut transfer = easy.transfer();
            transfer
                .write_function(move |data| {
                    let total =
                        bytes_cb.fetch_add(data.len() as u64, Ordering::Relaxed) + data.len() as u64;
                    if self.cancel_requested() || (threshold != 0 && total >= threshold) {
                        break_cb.store(true, Ordering::Relaxed);
                        return Ok(0); // abort the transfer
                    }
                    Ok(data.len())
                })
                .map_err(net)?;
            if let Err(e) = transfer.perform() {
                // Our own abort surfaces as a write error; anything else is
                // a real network fault.
                if e.is_write_error() && break_load.load(Ordering::Relaxed) {
                    return Ok(());
                }
                return Err(net(e));
            }
        }

        let code = easy.response_code().map_err(net)?;
        if !(200..300).contains(&code) {
            return Err(PreloadError::Network(anyhow!(
                "GET {} returned HTTP {}",
                proxy_url,
                code
            )));
        }
        Ok(())
    }
}

fn net(e: curl::Error) -> PreloadError {
    PreloadError::Network(anyhow::Error::new(e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proxy::DirectProxy;
    use std::path::PathBuf;

    struct FailingProxy;

    impl ProxyServer for FailingProxy {
        fn proxy_url(&self, _url: &str) -> anyhow::Result<String> {
            Err(anyhow!("proxy server not running"))
        }

        fn cache_file(&self, url: &str) -> PathBuf {
            PathBuf::from(crate::proxy::cache_name(url))
        }
    }

    #[test]
    fn cancel_before_run_reports_canceled() {
        let dir = tempfile::tempdir().unwrap();
        let proxy = Arc::new(DirectProxy::new(dir.path().to_path_buf()));
        let resource = ResourceRef::resolve(proxy.as_ref(), "http://127.0.0.1:9/video.mp4");
        let task = PreloadTask::new(proxy, resource, 0);

        task.request_cancel();
        task.request_cancel(); // idempotent

        let outcome = task.run();
        assert!(matches!(outcome, PreloadOutcome::Canceled));
        assert_eq!(task.state(), TaskState::Canceled);
    }

    #[test]
    fn collaborator_failure_reports_failed() {
        let resource = ResourceRef::resolve(&FailingProxy, "http://x/v");
        let task = PreloadTask::new(Arc::new(FailingProxy), resource, 0);

        let outcome = task.run();
        assert!(matches!(
            outcome,
            PreloadOutcome::Failed(PreloadError::Network(_))
        ));
        assert_eq!(task.state(), TaskState::Failed);
    }

    #[test]
    fn outcome_labels() {
        assert_eq!(PreloadOutcome::Cached.label(), "cached");
        assert_eq!(PreloadOutcome::Preloaded.label(), "preloaded");
        assert_eq!(PreloadOutcome::Canceled.label(), "canceled");
        assert_eq!(
            PreloadOutcome::Failed(PreloadError::EmptyStream).label(),
            "failed"
        );
    }

    #[test]
    fn new_task_is_pending() {
        let dir = tempfile::tempdir().unwrap();
        let proxy = Arc::new(DirectProxy::new(dir.path().to_path_buf()));
        let resource = ResourceRef::resolve(proxy.as_ref(), "http://x/v");
        let task = PreloadTask::new(proxy, resource, 1024);
        assert_eq!(task.state(), TaskState::Pending);
        assert!(!task.cancel_requested());
    }
}
