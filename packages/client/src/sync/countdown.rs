//! Per-seat countdown timers.
//!
//! Each held seat with a known expiry gets a one-second ticker publishing the
//! remaining whole seconds on a `watch` channel. At zero the ticker stops and
//! asks for a near-term sync. A seat leaving the board stops its ticker.

use std::{collections::HashMap, sync::Arc, time::Duration};

use encuentro_shared::time::Clock;
use tokio::{sync::watch, task::JoinHandle};
use tokio_util::sync::CancellationToken;

use crate::domain::{SeatNumber, Timestamp};

use super::trigger::{SyncReason, SyncTrigger};

const TICK: Duration = Duration::from_secs(1);

#[derive(Debug)]
struct Countdown {
    expiry: Timestamp,
    remaining: watch::Receiver<u64>,
    task: JoinHandle<()>,
}

pub struct CountdownBoard {
    clock: Arc<dyn Clock>,
    trigger: SyncTrigger,
    token: CancellationToken,
    entries: HashMap<SeatNumber, Countdown>,
}

impl CountdownBoard {
    pub fn new(clock: Arc<dyn Clock>, trigger: SyncTrigger, token: CancellationToken) -> Self {
        Self {
            clock,
            trigger,
            token,
            entries: HashMap::new(),
        }
    }

    /// Align the board with the held seats that carry an expiry.
    ///
    /// Seats no longer listed stop; seats whose expiry changed restart; a
    /// finished timer with an unchanged expiry stays finished.
    pub fn sync_with(&mut self, held: &[(SeatNumber, Timestamp)]) {
        let wanted: HashMap<SeatNumber, Timestamp> = held.iter().copied().collect();

        self.entries.retain(|number, countdown| {
            let keep = wanted.get(number) == Some(&countdown.expiry);
            if !keep {
                countdown.task.abort();
            }
            keep
        });

        if self.token.is_cancelled() {
            return;
        }

        for (number, expiry) in wanted {
            if !self.entries.contains_key(&number) {
                let countdown = self.start(number, expiry);
                self.entries.insert(number, countdown);
            }
        }
    }

    /// Remaining seconds feed for a seat, if it has a timer.
    pub fn subscribe(&self, number: SeatNumber) -> Option<watch::Receiver<u64>> {
        self.entries
            .get(&number)
            .map(|countdown| countdown.remaining.clone())
    }

    pub fn remaining(&self, number: SeatNumber) -> Option<u64> {
        self.entries
            .get(&number)
            .map(|countdown| *countdown.remaining.borrow())
    }

    pub fn is_running(&self, number: SeatNumber) -> bool {
        self.entries
            .get(&number)
            .is_some_and(|countdown| !countdown.task.is_finished())
    }

    pub fn running_count(&self) -> usize {
        self.entries
            .values()
            .filter(|countdown| !countdown.task.is_finished())
            .count()
    }

    pub fn clear(&mut self) {
        for (_, countdown) in self.entries.drain() {
            countdown.task.abort();
        }
    }

    fn start(&self, number: SeatNumber, expiry: Timestamp) -> Countdown {
        let clock = Arc::clone(&self.clock);
        let initial = remaining_secs(expiry, clock.now_millis());
        let (tx, rx) = watch::channel(initial);
        let trigger = self.trigger.clone();
        let token = self.token.clone();
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now(), TICK);

        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => return,
                    _ = ticker.tick() => {}
                }

                let remaining = remaining_secs(expiry, clock.now_millis());
                tx.send_replace(remaining);
                if remaining == 0 {
                    tracing::debug!("Hold on seat {} reached zero", number);
                    trigger.request(SyncReason::CountdownElapsed(number));
                    return;
                }
            }
        });

        Countdown {
            expiry,
            remaining: rx,
            task,
        }
    }
}

impl Drop for CountdownBoard {
    fn drop(&mut self) {
        self.clear();
    }
}

fn remaining_secs(expiry: Timestamp, now_millis: i64) -> u64 {
    expiry.millis_after(Timestamp::new(now_millis)) / 1000
}

/// Render remaining seconds as `mm:ss`.
pub fn format_remaining(secs: u64) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}
