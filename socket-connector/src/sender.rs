//! Outbound payload state for one logical request.
//!
//! [`Sender`] owns the request payload and a write offset.  It does **not**
//! decide when to write; [`crate::connection`] calls [`Sender::on_writable`]
//! for every writable event.
//!
//! # Contract
//! - Each attempt starts from offset 0 ([`Sender::rewind`]).
//! - A writable event writes as much of the remainder as the transport takes.
//! - The payload counts as sent only once every byte has been accepted, and
//!   after that further writable events write nothing.

use std::io;

use crate::transport::Transport;

#[derive(Debug)]
pub struct Sender {
    payload: Vec<u8>,
    /// Bytes of `payload` already accepted by the transport in this attempt.
    offset: usize,
}

impl Sender {
    pub fn new(payload: Vec<u8>) -> Self {
        Self { payload, offset: 0 }
    }

    /// Start over for a new attempt.
    pub fn rewind(&mut self) {
        self.offset = 0;
    }

    /// `true` once the whole payload has been written.  Always true for an
    /// empty payload.
    pub fn is_complete(&self) -> bool {
        self.offset >= self.payload.len()
    }

    pub fn written(&self) -> usize {
        self.offset
    }

    fn remaining(&self) -> &[u8] {
        &self.payload[self.offset..]
    }

    /// Push the unwritten remainder into `transport`.
    ///
    /// Stops at `WouldBlock`, keeping the offset for the next writable event.
    /// Returns the number of bytes written by this call.
    pub fn on_writable<T: Transport + ?Sized>(&mut self, transport: &mut T) -> io::Result<usize> {
        let mut written = 0;
        while !self.is_complete() {
            match transport.try_write(self.remaining()) {
                Ok(0) => {
                    return Err(io::Error::new(
                        io::ErrorKind::WriteZero,
                        "transport accepted no bytes",
                    ))
                }
                Ok(n) => {
                    self.offset += n;
                    written += n;
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(written)
    }
}
