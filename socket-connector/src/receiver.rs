//! Response accumulation.
//!
//! The [`Receiver`] collects every byte read during an attempt, in arrival
//! order, until the peer closes its write side.  It never hands out partial
//! data: the buffer is only taken once end-of-stream has been seen.

use std::io;

use crate::transport::Transport;

/// Size of the scratch buffer used for each `try_read`.
pub const READ_CHUNK: usize = 1024;

/// State of the read side after draining.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadStatus {
    /// Everything available was read; more may follow.
    Open,
    /// The peer closed the stream.
    EndOfStream,
}

#[derive(Debug, Default)]
pub struct Receiver {
    buffer: Vec<u8>,
}

impl Receiver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Discard everything; called when a new attempt begins.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Read everything currently available from `transport`.
    pub fn drain<T: Transport + ?Sized>(&mut self, transport: &mut T) -> io::Result<ReadStatus> {
        let mut chunk = [0u8; READ_CHUNK];
        loop {
            match transport.try_read(&mut chunk) {
                Ok(0) => return Ok(ReadStatus::EndOfStream),
                Ok(n) => self.buffer.extend_from_slice(&chunk[..n]),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(ReadStatus::Open),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }

    /// Take the accumulated response, leaving the buffer empty.
    pub fn take(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.buffer)
    }
}
