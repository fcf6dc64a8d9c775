//! Request and connector configuration.
//!
//! [`AttemptConfig`] describes one logical request and is fixed for its whole
//! lifetime.  [`ConnectorConfig`] carries the core parameters shared by every
//! request a [`crate::connection::ConnectionAttemptManager`] starts.

use std::time::Duration;

use crate::decode::{Decoding, OnDecodeError};
use crate::retry::DEFAULT_RETRY_DELAY;
use crate::timer::DEFAULT_INACTIVITY_TIMEOUT;

/// Target and payload of a single logical request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptConfig {
    pub host: String,
    pub port: u16,
    /// Written once per attempt.  May be empty.
    pub payload: Vec<u8>,
    /// Re-attempts allowed after connection errors.  Defaults to 0.
    pub max_retries: u32,
}

impl AttemptConfig {
    pub fn new(host: impl Into<String>, port: u16, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            host: host.into(),
            port,
            payload: payload.into(),
            max_retries: 0,
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }
}

/// Core parameters of the attempt manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectorConfig {
    /// Longest allowed silence between two transport events.
    pub inactivity_timeout: Duration,
    /// Fixed wait between a failed attempt and the next one.
    pub retry_delay: Duration,
    pub decoding: Decoding,
    pub on_decode_error: OnDecodeError,
}

impl Default for ConnectorConfig {
    fn default() -> Self {
        Self {
            inactivity_timeout: DEFAULT_INACTIVITY_TIMEOUT,
            retry_delay: DEFAULT_RETRY_DELAY,
            decoding: Decoding::Raw,
            on_decode_error: OnDecodeError::Report,
        }
    }
}

impl ConnectorConfig {
    pub fn with_inactivity_timeout(mut self, timeout: Duration) -> Self {
        self.inactivity_timeout = timeout;
        self
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn with_decoding(mut self, decoding: Decoding) -> Self {
        self.decoding = decoding;
        self
    }

    pub fn with_on_decode_error(mut self, policy: OnDecodeError) -> Self {
        self.on_decode_error = policy;
        self
    }
}
