//! Expiry scheduler: one timer armed at the soonest hold expiry.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::domain::Timestamp;

use super::trigger::{SyncReason, SyncTrigger};

#[derive(Debug)]
struct ArmedTimer {
    expiry: Timestamp,
    task: JoinHandle<()>,
}

/// Holds at most one pending timer. Re-arming always cancels the previous
/// one first.
#[derive(Debug)]
pub struct ExpiryScheduler {
    trigger: SyncTrigger,
    buffer: Duration,
    token: CancellationToken,
    armed: Option<ArmedTimer>,
}

impl ExpiryScheduler {
    pub fn new(trigger: SyncTrigger, buffer: Duration, token: CancellationToken) -> Self {
        Self {
            trigger,
            buffer,
            token,
            armed: None,
        }
    }

    /// Arm for `next` + buffer, or disarm when `next` is `None`.
    ///
    /// A pending timer for the same expiry is kept as is.
    pub fn rearm(&mut self, next: Option<Timestamp>, now: Timestamp) {
        if self.token.is_cancelled() {
            self.cancel();
            return;
        }

        if let (Some(next), Some(armed)) = (next, &self.armed)
            && armed.expiry == next
            && !armed.task.is_finished()
        {
            return;
        }

        self.cancel();
        let Some(expiry) = next else {
            return;
        };

        let delay = Duration::from_millis(expiry.millis_after(now)) + self.buffer;
        let deadline = tokio::time::Instant::now() + delay;
        let trigger = self.trigger.clone();
        let token = self.token.clone();
        tracing::debug!("Expiry timer armed for {} ms from now", delay.as_millis());

        let task = tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep_until(deadline) => {
                    trigger.request(SyncReason::HoldExpiry);
                }
            }
        });
        self.armed = Some(ArmedTimer { expiry, task });
    }

    /// Earliest expiry still worth scheduling at `now`.
    ///
    /// An expiry that passed less than one buffer ago has not been
    /// reconciled yet and keeps its timer.
    pub fn horizon(&self, now: Timestamp) -> Timestamp {
        let buffer = i64::try_from(self.buffer.as_millis()).unwrap_or(i64::MAX);
        Timestamp::new(now.value().saturating_sub(buffer))
    }

    /// Expiry the pending timer is armed for.
    pub fn armed_for(&self) -> Option<Timestamp> {
        self.armed
            .as_ref()
            .filter(|armed| !armed.task.is_finished())
            .map(|armed| armed.expiry)
    }

    pub fn is_armed(&self) -> bool {
        self.armed_for().is_some()
    }

    pub fn cancel(&mut self) {
        if let Some(armed) = self.armed.take() {
            armed.task.abort();
        }
    }
}

impl Drop for ExpiryScheduler {
    fn drop(&mut self) {
        self.cancel();
    }
}
