//! Error types shared by the transport layer and the attempt manager.
//!
//! Nothing here escapes the manager as a `Result`: every [`ConnError`] is
//! eventually converted into an [`crate::outcome::Outcome`] and handed to the
//! observer.

use std::time::Duration;

use thiserror::Error;

/// Code reported when the OS gave no errno for a transport failure.
pub const GENERIC_ERROR_CODE: i32 = -1;

/// A socket-level failure: refused, reset, unresolvable host, and so on.
///
/// Captured with a numeric code and a human-readable message so it can be
/// surfaced verbatim through [`crate::outcome::Observer::on_error`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} (code {code})")]
pub struct TransportError {
    /// OS error number when available, otherwise [`GENERIC_ERROR_CODE`].
    pub code: i32,
    /// Description of the failure.
    pub message: String,
}

impl TransportError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        Self {
            code: err.raw_os_error().unwrap_or(GENERIC_ERROR_CODE),
            message: err.to_string(),
        }
    }
}

/// Everything that can end a logical request without a successful response.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnError {
    /// The transport failed. Retryable while retries remain.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
    /// No activity was observed within the guard interval. Never retried.
    #[error("no activity for {0:?}")]
    Timeout(Duration),
    /// The response bytes are not valid in the configured encoding.
    #[error("response of {len} bytes is not valid {encoding}")]
    ProtocolDecode { encoding: &'static str, len: usize },
}

impl ConnError {
    /// Whether the retry policy may be consulted for this error.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}
