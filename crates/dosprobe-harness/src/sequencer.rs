//! Timed dispatch of key presses.
//!
//! Every key code becomes a well-formed press/release pair with a settle
//! delay after each half, so the emulated keyboard buffer never sees two
//! events too close together or out of order.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::clock::Clock;
use crate::emulator::Emulator;
use crate::error::HarnessError;
use crate::key::KeyCode;

/// Dispatches key codes one at a time.
pub struct InputSequencer {
    clock: Arc<dyn Clock>,
    settle: Duration,
}

impl InputSequencer {
    pub fn new(clock: Arc<dyn Clock>, settle: Duration) -> Self {
        Self { clock, settle }
    }

    pub fn settle_delay(&self) -> Duration {
        self.settle
    }

    /// Press and release each code in order.
    ///
    /// For each code: key-down, settle, key-up, settle. The first failed
    /// injection aborts the rest of the sequence. A failed key-up is not
    /// retried, so that key stays held in the guest; callers treat the
    /// emulator as unusable after any injection error.
    pub async fn send(
        &self,
        emulator: &mut dyn Emulator,
        codes: &[KeyCode],
    ) -> Result<(), HarnessError> {
        for &code in codes {
            emulator.inject_key_event(code, true)?;
            debug!(%code, "key down");
            self.clock.sleep(self.settle).await;

            emulator.inject_key_event(code, false)?;
            debug!(%code, "key up");
            self.clock.sleep(self.settle).await;
        }
        Ok(())
    }
}
