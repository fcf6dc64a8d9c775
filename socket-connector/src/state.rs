//! Lifecycle states of a logical request.
//!
//! ```text
//!  Idle ──open──▶ Connecting ──opened──▶ Sending ──payload written──▶ Receiving
//!                    ▲   │                  │                            │
//!                    │   └──── error ───────┴──────── error ─────────────┤
//!                    │                                                   │
//!               RetryWait ◀── retries left ── error          end-of-stream
//!                                                │                       │
//!                                    no retries  ▼                       ▼
//!                                             Failed                 Succeeded
//!
//!  any non-terminal state ── guard fires ──▶ TimedOut
//! ```
//!
//! Transitions are driven by [`crate::connection`]; this module only names
//! them.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AttemptState {
    /// Nothing started yet.
    #[default]
    Idle,
    /// Transport allocated, waiting for the socket to open.
    Connecting,
    /// Socket open, payload not fully written.
    Sending,
    /// Payload written; accumulating the response.
    Receiving,
    /// Attempt failed with retries left; waiting out the retry delay.
    RetryWait,
    /// End-of-stream reached; success delivered.
    Succeeded,
    /// Error delivered.
    Failed,
    /// Guard fired; timeout delivered.
    TimedOut,
}

impl AttemptState {
    /// Terminal states accept exactly one observer notification and nothing else.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::TimedOut)
    }
}

impl std::fmt::Display for AttemptState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}
