//! Time source for every suspension point in the harness.
//!
//! Settle delays and poll intervals go through a [`Clock`] so tests can
//! substitute a recording clock for real timers.

use std::time::Duration;

use async_trait::async_trait;

/// Suspends the current task.
#[async_trait]
pub trait Clock: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Real timers from the tokio runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
