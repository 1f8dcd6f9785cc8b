//! Error types for conversion calls and queue mutations.

use thiserror::Error;

use crate::convert::Mode;

/// Why a single job could not be converted.
///
/// `Display` is the normalized message stored on a failed job and written to
/// the session log, so every variant renders as one readable line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConvertError {
    /// A local precondition failed; nothing was sent to the server.
    #[error("{mode} 模式缺少必填项: {input}")]
    MissingRequiredInput { mode: Mode, input: &'static str },

    /// The server answered, but not with `status = "success"`.
    #[error("{0}")]
    RemoteRejection(String),

    /// The call did not complete (connect, timeout, unreadable body or source file).
    #[error("{0}")]
    TransportFailure(String),
}

impl From<reqwest::Error> for ConvertError {
    fn from(e: reqwest::Error) -> Self {
        ConvertError::TransportFailure(e.to_string())
    }
}

/// Rejections from queue-mutating session entry points.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// A batch holds the queue.
    #[error("batch is running; wait for it to finish")]
    Busy,
    /// No job with the given id.
    #[error("job not found")]
    UnknownJob,
    /// Only pending jobs can be removed.
    #[error("only pending jobs can be removed")]
    NotPending,
    /// Only failed or pending jobs can be re-run.
    #[error("only failed or pending jobs can be retried")]
    NotRetryable,
}
