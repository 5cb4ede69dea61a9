//! Preload error taxonomy.
//!
//! `InvalidArgument` and `DuplicateTaskId` are rejected synchronously at the
//! call boundary and never reach the executor; `Network` and `EmptyStream`
//! surface asynchronously as a `Failed` terminal outcome.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PreloadError {
    /// Caller passed an empty resource URL.
    #[error("resource url is empty")]
    InvalidArgument,

    /// A preload is still active under this id.
    #[error("preload task {0} is already active")]
    DuplicateTaskId(i64),

    /// Connect/read timeout, connection reset, non-2xx response, or a
    /// collaborator failure while resolving the proxy URL.
    #[error("network failure: {0}")]
    Network(anyhow::Error),

    /// The stream ended without delivering a single byte. Distinguished from
    /// a clean empty resource: it indicates a broken fetch.
    #[error("no bytes received from stream")]
    EmptyStream,

    /// The executor has been shut down and rejects new work.
    #[error("executor is shut down, not accepting work")]
    NotAcceptingWork,
}
