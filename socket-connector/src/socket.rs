//! TCP transport.
//!
//! [`TcpTransport`] is a thin wrapper around `tokio::net::TcpStream` that
//! turns socket readiness into [`TransportEvent`]s.  All protocol logic lives
//! in [`crate::connection`]; this module owns only the stream.

use std::future::Future;
use std::io;
use std::pin::Pin;

use async_trait::async_trait;
use tokio::io::Interest;
use tokio::net::TcpStream;

use crate::transport::{Connector, Transport, TransportEvent};

type ConnectFuture = Pin<Box<dyn Future<Output = io::Result<TcpStream>> + Send>>;

// ---------------------------------------------------------------------------
// Connector
// ---------------------------------------------------------------------------

/// Opens TCP streams.  Name resolution is left to the OS resolver.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpConnector;

impl Connector for TcpConnector {
    type Transport = TcpTransport;

    fn open(&self, host: &str, port: u16) -> io::Result<TcpTransport> {
        if host.trim().is_empty() {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "empty host"));
        }
        let host = host.to_owned();
        log::trace!("opening tcp stream to {host}:{port}");
        let connect = Box::pin(async move { TcpStream::connect((host, port)).await });
        Ok(TcpTransport {
            phase: Phase::Connecting(connect),
        })
    }
}

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

enum Phase {
    /// Connect in progress.  Kept here so a cancelled `next_event` resumes it.
    Connecting(ConnectFuture),
    Open(TcpStream),
    Closed,
}

/// A TCP stream being driven by one attempt.
pub struct TcpTransport {
    phase: Phase,
}

impl TcpTransport {
    fn not_open() -> io::Error {
        io::Error::new(io::ErrorKind::NotConnected, "stream is not open")
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn next_event(&mut self, want_write: bool) -> TransportEvent {
        if let Phase::Connecting(connect) = &mut self.phase {
            let result = connect.await;
            return match result {
                Ok(stream) => {
                    self.phase = Phase::Open(stream);
                    TransportEvent::Opened
                }
                Err(e) => {
                    self.phase = Phase::Closed;
                    TransportEvent::Error(e.into())
                }
            };
        }

        let Phase::Open(stream) = &mut self.phase else {
            return std::future::pending().await;
        };

        let interest = if want_write {
            Interest::READABLE | Interest::WRITABLE
        } else {
            Interest::READABLE
        };
        match stream.ready(interest).await {
            Ok(ready) if want_write && ready.is_writable() => TransportEvent::Writable,
            // Covers read-closed too: the drain sees the 0-byte read.
            Ok(_) => TransportEvent::Readable,
            Err(e) => TransportEvent::Error(e.into()),
        }
    }

    fn try_write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match &self.phase {
            Phase::Open(stream) => stream.try_write(buf),
            _ => Err(Self::not_open()),
        }
    }

    fn try_read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match &self.phase {
            Phase::Open(stream) => stream.try_read(buf),
            _ => Err(Self::not_open()),
        }
    }

    fn close(&mut self) {
        // Dropping the stream (or the pending connect) releases the socket.
        self.phase = Phase::Closed;
    }
}
