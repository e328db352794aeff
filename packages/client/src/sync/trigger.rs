//! Requests for the sync worker.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use tokio::sync::mpsc;

use crate::domain::SeatNumber;

/// Why a snapshot fetch was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncReason {
    Initial,
    Poll,
    HoldConfirmed(SeatNumber),
    HoldFailed(SeatNumber),
    HoldExpiry,
    CountdownElapsed(SeatNumber),
    PurchaseSettled,
    StaleSnapshot,
}

/// Cloneable sender side of the sync worker queue.
///
/// The busy flag is raised by the worker for the duration of a fetch so
/// periodic polls can be dropped instead of queued behind it.
#[derive(Debug, Clone)]
pub struct SyncTrigger {
    tx: mpsc::UnboundedSender<SyncReason>,
    busy: Arc<AtomicBool>,
}

impl SyncTrigger {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<SyncReason>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let trigger = Self {
            tx,
            busy: Arc::new(AtomicBool::new(false)),
        };
        (trigger, rx)
    }

    /// Queue a sync request. Returns false once the worker is gone.
    pub fn request(&self, reason: SyncReason) -> bool {
        match self.tx.send(reason) {
            Ok(()) => true,
            Err(_) => {
                tracing::debug!("Sync worker stopped, dropping {:?}", reason);
                false
            }
        }
    }

    /// Queue a sync request unless a fetch is already running.
    pub fn request_if_idle(&self, reason: SyncReason) -> bool {
        if self.is_busy() {
            tracing::debug!("Snapshot fetch in flight, skipping {:?}", reason);
            return false;
        }
        self.request(reason)
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    pub(crate) fn set_busy(&self, busy: bool) {
        self.busy.store(busy, Ordering::Release);
    }
}
