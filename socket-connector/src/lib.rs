//! `socket-connector` — a single-request TCP client.
//!
//! Opens a socket to a host/port, writes one request payload, reads until the
//! peer closes the connection and reports exactly one [`Outcome`] (success,
//! error or timeout) to an [`Observer`].  Connection errors are retried a
//! bounded number of times after a fixed delay; inactivity is terminal.
//!
//! # Architecture
//!
//! ```text
//!  caller ── start(AttemptConfig, Observer) ──┐
//!                                             ▼
//!  ┌──────────────────────────────────────────────────────────┐
//!  │              ConnectionAttemptManager task               │
//!  │  RetryPolicy ── TimeoutGuard ── Sender ── Receiver       │
//!  └────────────┬─────────────────────────────────────────────┘
//!               │ TransportEvent (Opened/Writable/Readable/End/Error)
//!  ┌────────────▼──────────┐        ┌────────────────────────┐
//!  │  TcpTransport (tokio) │   or   │ ScriptedTransport      │
//!  └───────────────────────┘        └────────────────────────┘
//! ```
//!
//! Each module has a single responsibility:
//! - [`connection`] — attempt lifecycle state machine and public entry points
//! - [`transport`]   — `Connector` / `Transport` traits and events
//! - [`socket`]      — TCP implementation of the transport
//! - [`simulator`]   — scripted transport for deterministic tests
//! - [`sender`]      — payload write offset
//! - [`receiver`]    — response accumulation until end-of-stream
//! - [`timer`]       — inactivity timeout guard
//! - [`retry`]       — retry budget and delay
//! - [`decode`]      — optional text decoding of the response
//! - [`state`]       — lifecycle states
//! - [`outcome`]     — terminal outcome and observer contract
//! - [`config`]      — request and connector configuration
//! - [`error`]       — error types

pub mod config;
pub mod connection;
pub mod decode;
pub mod error;
pub mod outcome;
pub mod receiver;
pub mod retry;
pub mod sender;
pub mod simulator;
pub mod socket;
pub mod state;
pub mod timer;
pub mod transport;

pub use config::{AttemptConfig, ConnectorConfig};
pub use connection::ConnectionAttemptManager;
pub use decode::{Decoding, OnDecodeError};
pub use error::{ConnError, TransportError};
pub use outcome::{Observer, Outcome};
pub use socket::TcpConnector;
