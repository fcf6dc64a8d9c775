//! Inactivity timeout guard.
//!
//! Every attempt is watched by a [`TimeoutGuard`].  The manager stops the
//! guard when a transport event arrives and re-arms it once the event has been
//! handled, so the guard measures time since the last observed activity rather
//! than total attempt duration.
//!
//! The guard wraps a single pinned `tokio::time::Sleep` that is reset in place
//! on every arm.  A disarmed guard parks its sleep far in the future and
//! [`TimeoutGuard::fired`] never resolves, which lets it sit in a
//! `tokio::select!` branch unconditionally.

use std::pin::Pin;
use std::time::Duration;

use tokio::time::{Instant, Sleep};

/// Default guard interval.
pub const DEFAULT_INACTIVITY_TIMEOUT: Duration = Duration::from_secs(3);

/// Deadline used while disarmed.
const FAR_FUTURE: Duration = Duration::from_secs(365 * 24 * 3600);

/// One-shot timer that is re-armed on activity.
#[derive(Debug)]
pub struct TimeoutGuard {
    interval: Duration,
    sleep: Pin<Box<Sleep>>,
    armed: bool,
}

impl TimeoutGuard {
    /// Create a disarmed guard with the given interval.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            sleep: Box::pin(tokio::time::sleep_until(far_future())),
            armed: false,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Cancel any pending fire and schedule a new one `interval` from now.
    pub fn arm(&mut self) {
        self.sleep.as_mut().reset(Instant::now() + self.interval);
        self.armed = true;
    }

    /// Cancel without rescheduling.
    pub fn disarm(&mut self) {
        if self.armed {
            self.sleep.as_mut().reset(far_future());
            self.armed = false;
        }
    }

    /// Resolve when the armed deadline passes.
    ///
    /// Pends forever while disarmed.  Resolves at most once per arm cycle:
    /// the guard disarms itself as it fires.  Dropping the returned future
    /// before it resolves leaves the guard untouched.
    pub async fn fired(&mut self) {
        if !self.armed {
            std::future::pending::<()>().await;
        }
        self.sleep.as_mut().await;
        self.armed = false;
    }
}

#[inline]
fn far_future() -> Instant {
    Instant::now() + FAR_FUTURE
}
