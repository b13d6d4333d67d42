//! Time source for the election and supervision loops
//!
//! Every sleep in cron-ha goes through [`Clock`] so that a loop can be driven
//! tick by tick in tests without waiting in real time.

use async_trait::async_trait;
use std::time::{Duration, Instant};

/// Source of the current time and of delays between ticks
#[async_trait]
pub trait Clock: Send + Sync {
    /// Current instant as seen by this clock
    fn now(&self) -> Instant;

    /// Suspend the caller for `duration`
    async fn sleep(&self, duration: Duration);
}

/// Wall clock backed by the tokio timer
///
/// Uses tokio's notion of `now`, so a runtime with paused time observes
/// consistent instants.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioClock;

impl TokioClock {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Clock for TokioClock {
    fn now(&self) -> Instant {
        tokio::time::Instant::now().into_std()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
