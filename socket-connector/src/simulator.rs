//! Scripted network for deterministic testing.
//!
//! Real sockets make it hard to exercise every interleaving of open, write,
//! read, close and failure events, or to test multi-second timeouts quickly.
//! [`ScriptedConnector`] hands out one [`Script`] per attempt and the
//! resulting [`ScriptedTransport`] replays it step by step:
//!
//! | Step            | Effect                                                 |
//! |-----------------|--------------------------------------------------------|
//! | `Open`          | emit `Opened`                                          |
//! | `Writable`      | emit `Writable` and refill the write budget            |
//! | `Data(bytes)`   | make `bytes` readable and emit `Readable`              |
//! | `Close`         | peer closes; emit `Readable`, reads then return 0      |
//! | `End`           | emit `End` directly                                    |
//! | `Fail(err)`     | emit `Error(err)`                                      |
//! | `Pause(d)`      | sleep `d` (tokio clock), then continue with next step  |
//! | `Stall`         | never emit anything again                              |
//!
//! The connector records every open, every byte written and every close in a
//! shared [`Probe`].  Pair it with `#[tokio::test(start_paused = true)]` so
//! pauses, the retry delay and the timeout guard run on virtual time.

use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::error::TransportError;
use crate::transport::{Connector, Transport, TransportEvent};

/// One scripted transport event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Open,
    Writable,
    Data(Vec<u8>),
    Close,
    End,
    Fail(TransportError),
    Pause(Duration),
    Stall,
}

impl Step {
    pub fn data(bytes: impl Into<Vec<u8>>) -> Self {
        Self::Data(bytes.into())
    }

    pub fn fail(code: i32, message: impl Into<String>) -> Self {
        Self::Fail(TransportError::new(code, message))
    }
}

/// Behaviour of a single attempt.
#[derive(Debug, Clone, Default)]
pub struct Script {
    /// `open` fails synchronously with this OS error number.
    refuse_open: Option<i32>,
    /// Bytes accepted per writable event; unlimited when `None`.
    write_budget: Option<usize>,
    steps: VecDeque<Step>,
}

impl Script {
    pub fn new(steps: impl IntoIterator<Item = Step>) -> Self {
        Self {
            steps: steps.into_iter().collect(),
            ..Self::default()
        }
    }

    /// An attempt whose `open` call itself fails.
    pub fn refused(os_error: i32) -> Self {
        Self {
            refuse_open: Some(os_error),
            ..Self::default()
        }
    }

    /// Limit how many bytes each writable event accepts.
    pub fn with_write_budget(mut self, bytes: usize) -> Self {
        self.write_budget = Some(bytes);
        self
    }
}

/// What the scripted network observed.
#[derive(Debug, Default)]
pub struct Probe {
    /// Virtual time of every `open`, successful or not.
    pub opens: Vec<Instant>,
    /// Bytes written, one entry per opened transport.
    pub written: Vec<Vec<u8>>,
    /// `close` calls that actually released a transport.
    pub closes: usize,
}

// ---------------------------------------------------------------------------
// Connector
// ---------------------------------------------------------------------------

/// Hands out scripted transports in order.  Runs out into refused opens.
#[derive(Debug, Clone, Default)]
pub struct ScriptedConnector {
    scripts: Arc<Mutex<VecDeque<Script>>>,
    probe: Arc<Mutex<Probe>>,
}

impl ScriptedConnector {
    pub fn new(scripts: impl IntoIterator<Item = Script>) -> Self {
        Self {
            scripts: Arc::new(Mutex::new(scripts.into_iter().collect())),
            probe: Arc::default(),
        }
    }

    /// Lock and inspect the shared probe.
    pub fn probe(&self) -> MutexGuard<'_, Probe> {
        lock(&self.probe)
    }
}

impl Connector for ScriptedConnector {
    type Transport = ScriptedTransport;

    fn open(&self, host: &str, port: u16) -> io::Result<ScriptedTransport> {
        lock(&self.probe).opens.push(Instant::now());
        let Some(script) = lock(&self.scripts).pop_front() else {
            return Err(io::Error::new(
                io::ErrorKind::ConnectionRefused,
                format!("no script left for {host}:{port}"),
            ));
        };
        if let Some(code) = script.refuse_open {
            return Err(io::Error::from_raw_os_error(code));
        }

        let slot = {
            let mut probe = lock(&self.probe);
            probe.written.push(Vec::new());
            probe.written.len() - 1
        };
        Ok(ScriptedTransport {
            steps: script.steps,
            write_budget: script.write_budget,
            budget_left: script.write_budget.unwrap_or(usize::MAX),
            readable: VecDeque::new(),
            peer_closed: false,
            closed: false,
            slot,
            probe: Arc::clone(&self.probe),
        })
    }
}

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct ScriptedTransport {
    steps: VecDeque<Step>,
    write_budget: Option<usize>,
    budget_left: usize,
    readable: VecDeque<u8>,
    peer_closed: bool,
    closed: bool,
    /// Index of this transport's entry in `Probe::written`.
    slot: usize,
    probe: Arc<Mutex<Probe>>,
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn next_event(&mut self, _want_write: bool) -> TransportEvent {
        // A pause is only popped after it elapses, so a cancelled call
        // replays it instead of skipping it.
        loop {
            if self.closed {
                return std::future::pending().await;
            }
            let Some(step) = self.steps.front().cloned() else {
                return std::future::pending().await;
            };
            if let Step::Pause(d) = step {
                tokio::time::sleep(d).await;
                self.steps.pop_front();
                continue;
            }
            self.steps.pop_front();
            return match step {
                Step::Open => TransportEvent::Opened,
                Step::Writable => {
                    self.budget_left = self.write_budget.unwrap_or(usize::MAX);
                    TransportEvent::Writable
                }
                Step::Data(bytes) => {
                    self.readable.extend(bytes);
                    TransportEvent::Readable
                }
                Step::Close => {
                    self.peer_closed = true;
                    TransportEvent::Readable
                }
                Step::End => TransportEvent::End,
                Step::Fail(err) => TransportEvent::Error(err),
                Step::Stall => {
                    self.steps.push_front(Step::Stall);
                    std::future::pending().await
                }
                Step::Pause(_) => unreachable!("pauses are consumed above"),
            };
        }
    }

    fn try_write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.closed {
            return Err(io::ErrorKind::NotConnected.into());
        }
        if self.budget_left == 0 {
            return Err(io::ErrorKind::WouldBlock.into());
        }
        let n = buf.len().min(self.budget_left);
        self.budget_left -= n;
        lock(&self.probe).written[self.slot].extend_from_slice(&buf[..n]);
        Ok(n)
    }

    fn try_read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.closed {
            return Err(io::ErrorKind::NotConnected.into());
        }
        if self.readable.is_empty() {
            return if self.peer_closed {
                Ok(0)
            } else {
                Err(io::ErrorKind::WouldBlock.into())
            };
        }
        let n = buf.len().min(self.readable.len());
        for (dst, src) in buf.iter_mut().zip(self.readable.drain(..n)) {
            *dst = src;
        }
        Ok(n)
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            lock(&self.probe).closes += 1;
        }
    }
}

/// A panic while the lock is held (typically a failed assertion in a test
/// inspecting the probe) leaves the counters intact, so poisoning is ignored.
fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
