//! Per-request connection lifecycle manager.
//!
//! A [`ConnectionAttemptManager`] turns an [`AttemptConfig`] into exactly one
//! [`Outcome`].  Each call to [`ConnectionAttemptManager::start`] spawns one
//! tokio task that owns all state of that logical request:
//! - the transport of the current attempt (at most one at a time),
//! - the [`TimeoutGuard`] watching it,
//! - the [`Sender`] write offset and the [`Receiver`] response buffer,
//! - the [`RetryPolicy`] budget, carried across attempts.
//!
//! Inside the task, transport events and the guard are raced with
//! `tokio::select!`, so events are handled one at a time in arrival order.
//! The guard is stopped before each event is handled and re-armed afterwards
//! unless the event ended the attempt.
//!
//! ```text
//!            start
//!              │
//!              ▼
//!   ┌──▶ open_attempt ──open error──────────────┐
//!   │          │                                │
//!   │          ▼                                ▼
//!   │   select! { event, guard } ──error──▶ close_attempt ──retries left──┐
//!   │          │         │                      │                         │
//!   │          │         └──fired──▶ Timeout    └──none left──▶ Error     │
//!   │          ▼                                                          │
//!   │   end-of-stream ──▶ Success                                         │
//!   │                                                                     │
//!   └─────────────────────────── sleep(retry_delay) ◀─────────────────────┘
//! ```
//!
//! Closing an attempt drops its transport, so nothing emitted by attempt N
//! can ever be observed while attempt N+1 runs.

use std::io;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::config::{AttemptConfig, ConnectorConfig};
use crate::decode::{Decoding, OnDecodeError};
use crate::error::{ConnError, TransportError};
use crate::outcome::{self, Observer, Outcome};
use crate::receiver::{ReadStatus, Receiver};
use crate::retry::{RetryDecision, RetryPolicy};
use crate::sender::Sender;
use crate::socket::TcpConnector;
use crate::state::AttemptState;
use crate::timer::TimeoutGuard;
use crate::transport::{Connector, Transport, TransportEvent};

// ---------------------------------------------------------------------------
// Manager
// ---------------------------------------------------------------------------

/// Starts logical requests over transports produced by `C`.
#[derive(Debug, Clone)]
pub struct ConnectionAttemptManager<C: Connector = TcpConnector> {
    connector: C,
    config: ConnectorConfig,
}

impl ConnectionAttemptManager<TcpConnector> {
    /// Manager over real TCP sockets.
    pub fn tcp(config: ConnectorConfig) -> Self {
        Self::new(TcpConnector, config)
    }
}

impl<C: Connector> ConnectionAttemptManager<C> {
    pub fn new(connector: C, config: ConnectorConfig) -> Self {
        Self { connector, config }
    }

    /// Begin a logical request and report its outcome to `observer`.
    ///
    /// Returns immediately; the request runs on its own task, which finishes
    /// right after the observer has been called.  Must be called from within
    /// a tokio runtime.
    pub fn start<O: Observer>(&self, attempt: AttemptConfig, observer: O) -> JoinHandle<()> {
        let mut request = Request::new(self.connector.clone(), &self.config, attempt);
        tokio::spawn(async move {
            let outcome = request.run().await;
            outcome.deliver(observer);
        })
    }

    /// Run a logical request and wait for its outcome.
    pub async fn request(&self, attempt: AttemptConfig) -> Outcome {
        let (tx, rx) = oneshot::channel();
        self.start(attempt, tx);
        rx.await.unwrap_or_else(|_| outcome::abandoned())
    }
}

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

enum Event {
    Transport(TransportEvent),
    GuardFired,
}

/// How an attempt ended.
enum Ending {
    /// Terminal; deliver this.
    Done(Outcome),
    /// Failure; retried while it is retryable and the budget allows.
    Failed(ConnError),
}

/// State of one logical request.  Lives on exactly one task.
struct Request<C: Connector> {
    connector: C,
    host: String,
    port: u16,
    decoding: Decoding,
    on_decode_error: OnDecodeError,
    retry: RetryPolicy,
    guard: TimeoutGuard,
    sender: Sender,
    receiver: Receiver,
    transport: Option<C::Transport>,
    state: AttemptState,
    /// 1-based number of the current attempt, for logs.
    attempt: u32,
}

impl<C: Connector> Request<C> {
    fn new(connector: C, config: &ConnectorConfig, attempt: AttemptConfig) -> Self {
        log::debug!(
            "request to {}:{} ({} byte payload, {} retries, {} decoding)",
            attempt.host,
            attempt.port,
            attempt.payload.len(),
            attempt.max_retries,
            config.decoding.name()
        );
        Self {
            connector,
            host: attempt.host,
            port: attempt.port,
            decoding: config.decoding,
            on_decode_error: config.on_decode_error,
            retry: RetryPolicy::new(attempt.max_retries, config.retry_delay),
            guard: TimeoutGuard::new(config.inactivity_timeout),
            sender: Sender::new(attempt.payload),
            receiver: Receiver::new(),
            transport: None,
            state: AttemptState::Idle,
            attempt: 0,
        }
    }

    /// Drive attempts until one of them produces the request's outcome.
    async fn run(&mut self) -> Outcome {
        loop {
            let failure = match self.open_attempt() {
                Ok(()) => match self.drive().await {
                    Ending::Done(outcome) => {
                        debug_assert!(self.state.is_terminal(), "finished while {}", self.state);
                        return outcome;
                    }
                    Ending::Failed(err) => err,
                },
                Err(err) => {
                    log::debug!("[attempt {}] open failed: {err}", self.attempt);
                    ConnError::Transport(err)
                }
            };

            let decision = if failure.is_retryable() {
                self.retry.on_error()
            } else {
                RetryDecision::GiveUp
            };
            match decision {
                RetryDecision::Retry { delay } => {
                    self.state = AttemptState::RetryWait;
                    log::warn!(
                        "[attempt {}] {failure}; retrying in {delay:?} ({} left)",
                        self.attempt,
                        self.retry.remaining()
                    );
                    tokio::time::sleep(delay).await;
                }
                RetryDecision::GiveUp => {
                    self.state = AttemptState::Failed;
                    log::warn!("[attempt {}] {failure}; giving up", self.attempt);
                    return failure.into();
                }
            }
        }
    }

    /// Allocate a transport, reset per-attempt buffers and arm the guard.
    fn open_attempt(&mut self) -> Result<(), TransportError> {
        self.close_attempt();
        self.attempt += 1;
        self.receiver.clear();
        self.sender.rewind();
        self.state = AttemptState::Connecting;
        log::debug!("[attempt {}] connecting to {}:{}", self.attempt, self.host, self.port);

        let transport = self.connector.open(&self.host, self.port)?;
        self.transport = Some(transport);
        self.guard.arm();
        Ok(())
    }

    /// Release the transport and the guard.  Idempotent.
    fn close_attempt(&mut self) {
        self.guard.disarm();
        if let Some(mut transport) = self.transport.take() {
            transport.close();
            log::trace!("[attempt {}] transport released", self.attempt);
        }
    }

    /// Process events of the current attempt until it ends.
    async fn drive(&mut self) -> Ending {
        loop {
            let want_write = !self.sender.is_complete();
            let Some(transport) = self.transport.as_mut() else {
                return Ending::Failed(ConnError::Transport(TransportError::from(
                    io::Error::from(io::ErrorKind::NotConnected),
                )));
            };
            let event = tokio::select! {
                event = transport.next_event(want_write) => Event::Transport(event),
                () = self.guard.fired() => Event::GuardFired,
            };
            if let Some(ending) = self.on_event(event) {
                return ending;
            }
        }
    }

    fn on_event(&mut self, event: Event) -> Option<Ending> {
        self.guard.disarm();

        let event = match event {
            Event::GuardFired => return Some(self.time_out()),
            Event::Transport(event) => event,
        };
        log::debug!("[attempt {}] {event:?} while {}", self.attempt, self.state);

        match event {
            TransportEvent::Opened => {}
            TransportEvent::Writable => {
                if let Err(e) = self.write_payload() {
                    return Some(self.fail(e.into()));
                }
            }
            TransportEvent::Readable => match self.read_available() {
                Ok(ReadStatus::Open) => {}
                Ok(ReadStatus::EndOfStream) => return Some(self.finish()),
                Err(e) => return Some(self.fail(e.into())),
            },
            TransportEvent::End => return Some(self.finish()),
            TransportEvent::Error(err) => return Some(self.fail(err)),
        }

        self.state = if self.sender.is_complete() {
            AttemptState::Receiving
        } else {
            AttemptState::Sending
        };
        self.guard.arm();
        None
    }

    fn write_payload(&mut self) -> io::Result<()> {
        let Some(transport) = self.transport.as_mut() else {
            return Ok(());
        };
        let n = self.sender.on_writable(transport)?;
        if n > 0 {
            log::trace!(
                "[attempt {}] wrote {n} bytes ({} total)",
                self.attempt,
                self.sender.written()
            );
        }
        Ok(())
    }

    fn read_available(&mut self) -> io::Result<ReadStatus> {
        let Some(transport) = self.transport.as_mut() else {
            return Ok(ReadStatus::Open);
        };
        let before = self.receiver.len();
        let status = self.receiver.drain(transport)?;
        log::trace!(
            "[attempt {}] read {} bytes ({} buffered)",
            self.attempt,
            self.receiver.len() - before,
            self.receiver.len()
        );
        Ok(status)
    }

    /// End-of-stream: decode what was received and succeed.
    ///
    /// An undecodable response either fails the request (never retried) or
    /// succeeds empty, depending on the configured policy.
    fn finish(&mut self) -> Ending {
        let response = self.receiver.take();
        self.close_attempt();
        let received = response.len();

        let data = match self.decoding.decode(response) {
            Ok(data) => data,
            Err(err) => match self.on_decode_error {
                OnDecodeError::Report => return Ending::Failed(err),
                OnDecodeError::EmptySuccess => {
                    log::warn!("[attempt {}] {err}; delivering empty response", self.attempt);
                    Vec::new()
                }
            },
        };
        self.state = AttemptState::Succeeded;
        let outcome = Outcome::Success { data };
        log::info!("[attempt {}] {outcome} after {received} bytes", self.attempt);
        Ending::Done(outcome)
    }

    fn fail(&mut self, err: TransportError) -> Ending {
        log::debug!("[attempt {}] transport error while {}: {err}", self.attempt, self.state);
        self.close_attempt();
        Ending::Failed(ConnError::Transport(err))
    }

    /// Timeouts bypass the retry policy.
    fn time_out(&mut self) -> Ending {
        let interval = self.guard.interval();
        log::warn!(
            "[attempt {}] no activity for {interval:?} while {}",
            self.attempt,
            self.state
        );
        self.close_attempt();
        self.state = AttemptState::TimedOut;
        Ending::Done(ConnError::Timeout(interval).into())
    }
}
