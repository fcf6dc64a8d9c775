//! Terminal outcome of a logical request and the observer that receives it.
//!
//! The three observer callbacks are mutually exclusive.  Each one takes the
//! observer by value, so the type system guarantees that at most one of them
//! runs per logical request.

use std::fmt;

use tokio::sync::oneshot;

use crate::error::{ConnError, GENERIC_ERROR_CODE};

/// Status code of a successful request.
pub const STATUS_OK: i32 = 0;
/// Status code of a request that timed out.
pub const STATUS_TIMEOUT: i32 = -2;
/// Status code of a response that failed to decode.
pub const STATUS_DECODE_ERROR: i32 = -3;

/// Exactly one of these is produced per call to `start`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The peer closed the connection; `data` is everything it sent.
    Success { data: Vec<u8> },
    /// The request failed and no retries remain.
    Error { code: i32, message: String },
    /// No activity within the guard interval.
    Timeout,
}

impl Outcome {
    /// Numeric status: `0` on success, the failure code on error, `-2` on timeout.
    pub fn status_code(&self) -> i32 {
        match self {
            Self::Success { .. } => STATUS_OK,
            Self::Error { code, .. } => *code,
            Self::Timeout => STATUS_TIMEOUT,
        }
    }

    /// Short human-readable status.
    pub fn status_message(&self) -> &str {
        match self {
            Self::Success { .. } => "OK",
            Self::Error { message, .. } => message,
            Self::Timeout => "TimeOut",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Hand this outcome to `observer` through the matching callback.
    pub fn deliver<O: Observer>(self, observer: O) {
        match self {
            Self::Success { data } => observer.on_success(data),
            Self::Error { code, message } => observer.on_error(code, message),
            Self::Timeout => observer.on_timeout(),
        }
    }
}

impl From<ConnError> for Outcome {
    fn from(err: ConnError) -> Self {
        match err {
            ConnError::Transport(t) => Self::Error {
                code: t.code,
                message: t.message,
            },
            ConnError::Timeout(_) => Self::Timeout,
            e @ ConnError::ProtocolDecode { .. } => Self::Error {
                code: STATUS_DECODE_ERROR,
                message: e.to_string(),
            },
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success { data } => write!(f, "success ({} bytes)", data.len()),
            Self::Error { code, message } => write!(f, "error {code}: {message}"),
            Self::Timeout => write!(f, "timeout"),
        }
    }
}

/// Receiver of the single terminal notification of a logical request.
pub trait Observer: Send + 'static {
    /// The peer closed the stream; `data` is the (decoded) response.
    fn on_success(self, data: Vec<u8>);
    /// The request failed for good.
    fn on_error(self, code: i32, message: String);
    /// The inactivity guard fired.
    fn on_timeout(self);
}

/// Forward the outcome to whoever holds the receiving half.
///
/// A dropped receiver only means nobody is waiting any more, so the send
/// error is logged and discarded.
impl Observer for oneshot::Sender<Outcome> {
    fn on_success(self, data: Vec<u8>) {
        if self.send(Outcome::Success { data }).is_err() {
            log::debug!("outcome receiver dropped before success was delivered");
        }
    }

    fn on_error(self, code: i32, message: String) {
        if self.send(Outcome::Error { code, message }).is_err() {
            log::debug!("outcome receiver dropped before error was delivered");
        }
    }

    fn on_timeout(self) {
        if self.send(Outcome::Timeout).is_err() {
            log::debug!("outcome receiver dropped before timeout was delivered");
        }
    }
}

/// Outcome used when the task driving a request vanished without reporting.
pub(crate) fn abandoned() -> Outcome {
    Outcome::Error {
        code: GENERIC_ERROR_CODE,
        message: "request task ended without an outcome".into(),
    }
}
