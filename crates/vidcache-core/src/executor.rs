//! Serial task executor: the single worker lane for preload downloads.
//!
//! One dedicated thread drains a FIFO queue, so preloads never run
//! concurrently with each other (bounding bandwidth and disk contention).
//! Submission never blocks; after shutdown it fails instead of silently
//! dropping work.

use std::sync::mpsc::{self, Sender};
use std::sync::Mutex;
use std::thread::JoinHandle;

use crate::error::PreloadError;

type Job = Box<dyn FnOnce() + Send + 'static>;

pub struct SerialExecutor {
    tx: Mutex<Option<Sender<Job>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl SerialExecutor {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel::<Job>();
        let worker = std::thread::spawn(move || {
            while let Ok(job) = rx.recv() {
                job();
            }
        });
        Self {
            tx: Mutex::new(Some(tx)),
            worker: Mutex::new(Some(worker)),
        }
    }

    /// Enqueues `job` on the worker lane and returns immediately; jobs run
    /// one at a time in submission order.
    pub fn submit<F>(&self, job: F) -> Result<(), PreloadError>
    where
        F: FnOnce() + Send + 'static,
    {
        match self.tx.lock().unwrap().as_ref() {
            Some(tx) => tx
                .send(Box::new(job))
                .map_err(|_| PreloadError::NotAcceptingWork),
            None => Err(PreloadError::NotAcceptingWork),
        }
    }

    /// Closes the queue and waits for already-queued jobs to finish.
    /// Subsequent submissions fail with `NotAcceptingWork`.
    pub fn shutdown(&self) {
        self.tx.lock().unwrap().take();
        if let Some(worker) = self.worker.lock().unwrap().take() {
            if worker.join().is_err() {
                tracing::warn!("preload worker thread panicked");
            }
        }
    }
}

impl Default for SerialExecutor {
    fn default() -> Self {
        Self::new()
    }
}
