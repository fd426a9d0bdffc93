//! Polling for a visual milestone.
//!
//! [`ImageWatcher`] is a level-triggered wait: it sleeps for one interval,
//! checks the watch region, and repeats until the region matches or the
//! caller's abort signal is set. It never gives up on its own; deadlines
//! are the caller's business, wired in through the abort signal.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::debug;

use crate::clock::Clock;
use crate::emulator::Emulator;
use crate::error::HarnessError;
use crate::image::{self, WatchImage};

/// Caller-owned cancellation: the watch stops once the value is `true`.
pub type AbortSignal = watch::Receiver<bool>;

/// A fresh, unset abort signal and the sender that sets it.
pub fn abort_signal() -> (watch::Sender<bool>, AbortSignal) {
    watch::channel(false)
}

/// An abort signal that sets itself after `duration` of tokio time.
///
/// Must be called from within a tokio runtime.
pub fn abort_after(duration: Duration) -> AbortSignal {
    let (tx, rx) = abort_signal();
    tokio::spawn(async move {
        tokio::time::sleep(duration).await;
        let _ = tx.send(true);
    });
    rx
}

/// Polls an emulator's frame for a watch image.
pub struct ImageWatcher {
    clock: Arc<dyn Clock>,
    default_interval: Duration,
}

impl ImageWatcher {
    pub fn new(clock: Arc<dyn Clock>, default_interval: Duration) -> Self {
        Self {
            clock,
            default_interval,
        }
    }

    pub fn default_interval(&self) -> Duration {
        self.default_interval
    }

    /// Wait until `image` is on screen or `abort` is set.
    ///
    /// Returns `Ok(())` in both cases; re-check with
    /// [`image::matches`] if the distinction matters. The abort signal is
    /// observed only between polls.
    pub async fn watch(
        &self,
        emulator: &dyn Emulator,
        image: &WatchImage,
        abort: Option<&AbortSignal>,
        interval: Option<Duration>,
    ) -> Result<(), HarnessError> {
        let interval = interval.unwrap_or(self.default_interval);
        let mut polls: u64 = 0;
        loop {
            self.clock.sleep(interval).await;
            polls += 1;

            if abort.is_some_and(|signal| *signal.borrow()) {
                debug!(polls, region = ?image.region(), "image watch aborted");
                return Ok(());
            }
            if image::matches(emulator, image)? {
                debug!(polls, region = ?image.region(), "image watch matched");
                return Ok(());
            }
        }
    }
}
