//! Fallback poller: periodic snapshot requests whose cadence follows the
//! realtime channel health.

use std::time::Duration;

use tokio::{task::JoinHandle, time::MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::config::SyncConfig;

use super::trigger::{SyncReason, SyncTrigger};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cadence {
    /// Realtime channel healthy
    Relaxed,
    /// Realtime channel degraded or never connected
    Aggressive,
}

#[derive(Debug)]
struct Ticker {
    cadence: Cadence,
    task: JoinHandle<()>,
}

#[derive(Debug)]
pub struct FallbackPoller {
    trigger: SyncTrigger,
    relaxed: Duration,
    aggressive: Duration,
    token: CancellationToken,
    ticker: Option<Ticker>,
}

impl FallbackPoller {
    pub fn new(trigger: SyncTrigger, config: &SyncConfig, token: CancellationToken) -> Self {
        Self {
            trigger,
            relaxed: config.relaxed_poll_interval,
            aggressive: config.aggressive_poll_interval,
            token,
            ticker: None,
        }
    }

    /// Switch cadence, stopping the running ticker before starting the new one.
    pub fn set_cadence(&mut self, cadence: Cadence) {
        if self.token.is_cancelled() {
            self.stop();
            return;
        }
        if self.cadence() == Some(cadence) {
            return;
        }

        self.stop();
        let period = self.interval_for(cadence);
        if period.is_zero() {
            tracing::warn!("Not polling: {:?} interval is zero", cadence);
            return;
        }
        tracing::info!("Polling every {} s ({:?})", period.as_secs(), cadence);

        let trigger = self.trigger.clone();
        let token = self.token.clone();
        let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = interval.tick() => {
                        trigger.request_if_idle(SyncReason::Poll);
                    }
                }
            }
        });
        self.ticker = Some(Ticker { cadence, task });
    }

    pub fn cadence(&self) -> Option<Cadence> {
        self.ticker
            .as_ref()
            .filter(|ticker| !ticker.task.is_finished())
            .map(|ticker| ticker.cadence)
    }

    pub fn current_interval(&self) -> Option<Duration> {
        self.cadence().map(|cadence| self.interval_for(cadence))
    }

    pub fn stop(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.task.abort();
        }
    }

    fn interval_for(&self, cadence: Cadence) -> Duration {
        match cadence {
            Cadence::Relaxed => self.relaxed,
            Cadence::Aggressive => self.aggressive,
        }
    }
}

impl Drop for FallbackPoller {
    fn drop(&mut self) {
        self.stop();
    }
}
