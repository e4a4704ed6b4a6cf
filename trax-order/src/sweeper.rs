use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{error, info};

use crate::orchestrator::BookingOrchestrator;

/// Periodic driver for the expiry sweep.
///
/// Expiry is wall-clock: lazily enforced when a payment arrives late, and
/// eagerly here for owners who never came back. There are no per-order
/// timers.
pub struct Sweeper {
    orchestrator: Arc<BookingOrchestrator>,
    interval: Duration,
}

impl Sweeper {
    pub fn new(orchestrator: Arc<BookingOrchestrator>, interval: Duration) -> Self {
        Self {
            orchestrator,
            interval,
        }
    }

    /// Runs forever; spawn on the runtime.
    pub async fn run(self) {
        info!(interval_secs = self.interval.as_secs(), "expiry sweeper started");
        let mut tick = tokio::time::interval(self.interval);
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tick.tick().await;
            match self.orchestrator.sweep_expired(Utc::now()).await {
                Ok(0) => {}
                Ok(swept) => info!(swept, "expiry sweep finished"),
                Err(e) => error!(error = %e, "expiry sweep failed"),
            }
        }
    }
}
