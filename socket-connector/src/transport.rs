//! Transport seam between the attempt manager and the byte stream.
//!
//! A [`Connector`] allocates one [`Transport`] per attempt.  The transport
//! reports readiness and closure as [`TransportEvent`]s and exposes
//! non-blocking reads and writes; the manager decides what to do with each
//! event.  [`crate::socket`] implements this over TCP and
//! [`crate::simulator`] replays scripted events for tests.

use std::io;

use async_trait::async_trait;

use crate::error::TransportError;

/// Something observed on the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// The connection is established.
    Opened,
    /// The stream can accept bytes.
    Writable,
    /// Bytes (or end-of-stream) can be read without blocking.
    Readable,
    /// The peer closed its write side; no more bytes will arrive.
    End,
    /// The connection failed.
    Error(TransportError),
}

/// One bidirectional byte stream, owned by a single attempt.
#[async_trait]
pub trait Transport: Send {
    /// Wait for the next event.
    ///
    /// `want_write` is false once the payload has been fully written, so a
    /// permanently writable socket does not keep producing events.  Must be
    /// cancel-safe: the manager races it against the timeout guard.
    async fn next_event(&mut self, want_write: bool) -> TransportEvent;

    /// Write as much of `buf` as possible without blocking.
    ///
    /// `ErrorKind::WouldBlock` means no space right now.
    fn try_write(&mut self, buf: &[u8]) -> io::Result<usize>;

    /// Read available bytes without blocking.
    ///
    /// `Ok(0)` means end-of-stream; `ErrorKind::WouldBlock` means nothing yet.
    fn try_read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Release the stream.  Idempotent.
    fn close(&mut self);
}

/// Allocates transports for attempts.
pub trait Connector: Clone + Send + Sync + 'static {
    type Transport: Transport + 'static;

    /// Start opening a stream to `host:port`.
    ///
    /// Returns immediately; completion is reported as
    /// [`TransportEvent::Opened`].  An error here is handled exactly like an
    /// asynchronous [`TransportEvent::Error`].
    fn open(&self, host: &str, port: u16) -> io::Result<Self::Transport>;
}
