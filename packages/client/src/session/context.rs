//! Shared state of one purchase session.
//!
//! Every mutation of the seat map goes through `SessionContext` and happens
//! under the `state` lock together with the timer refresh that depends on it.

use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, atomic::AtomicBool},
};

use encuentro_shared::time::Clock;
use tokio::sync::{Mutex, RwLock, broadcast, mpsc};
use tokio_util::sync::CancellationToken;

use crate::{
    config::SyncConfig,
    domain::{
        Buyer, EventId, Money, PricingTotals, Seat, SeatMap, SeatNumber, SeatPatch, TicketApi,
        Timestamp,
    },
    sync::{
        countdown::CountdownBoard,
        poller::FallbackPoller,
        scheduler::ExpiryScheduler,
        trigger::{SyncReason, SyncTrigger},
    },
};

use super::event::{PurchaseConfirmation, SessionEvent};

const EVENT_CAPACITY: usize = 64;

/// Collaborators injected into a session.
#[derive(Clone)]
pub struct SessionDeps {
    pub event_id: EventId,
    pub api: Arc<dyn TicketApi>,
    pub clock: Arc<dyn Clock>,
    pub config: SyncConfig,
}

/// Seat map plus the timers derived from it.
pub(crate) struct SessionState {
    pub(crate) map: SeatMap,
    pub(crate) scheduler: ExpiryScheduler,
    pub(crate) countdowns: CountdownBoard,
}

impl SessionState {
    pub(crate) fn refresh_timers(&mut self, now: Timestamp) {
        let horizon = self.scheduler.horizon(now);
        self.scheduler.rearm(self.map.next_expiry(horizon), now);
        self.countdowns.sync_with(&self.map.held_expiries());
    }

    pub(crate) fn stop_timers(&mut self) {
        self.scheduler.cancel();
        self.countdowns.clear();
    }
}

pub struct SessionContext {
    pub(crate) event_id: EventId,
    pub(crate) api: Arc<dyn TicketApi>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) config: SyncConfig,
    pub(crate) state: Mutex<SessionState>,
    pub(crate) poller: Mutex<FallbackPoller>,
    pub(crate) holds_in_flight: Mutex<HashSet<SeatNumber>>,
    pub(crate) hold_errors: Mutex<HashMap<SeatNumber, String>>,
    pub(crate) purchase_in_flight: AtomicBool,
    pub(crate) buyer: RwLock<Option<Buyer>>,
    pub(crate) unit_price: RwLock<Option<Money>>,
    pub(crate) confirmation: Mutex<Option<PurchaseConfirmation>>,
    pub(crate) events: broadcast::Sender<SessionEvent>,
    pub(crate) trigger: SyncTrigger,
    pub(crate) token: CancellationToken,
}

impl SessionContext {
    /// Build a context and the receiving end of its sync queue.
    pub fn new(deps: SessionDeps) -> (Arc<Self>, mpsc::UnboundedReceiver<SyncReason>) {
        let token = CancellationToken::new();
        let (trigger, sync_rx) = SyncTrigger::channel();
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        let state = SessionState {
            map: SeatMap::new(),
            scheduler: ExpiryScheduler::new(
                trigger.clone(),
                deps.config.expiry_buffer,
                token.clone(),
            ),
            countdowns: CountdownBoard::new(
                Arc::clone(&deps.clock),
                trigger.clone(),
                token.clone(),
            ),
        };
        let poller = FallbackPoller::new(trigger.clone(), &deps.config, token.clone());

        let context = Self {
            event_id: deps.event_id,
            api: deps.api,
            clock: deps.clock,
            config: deps.config,
            state: Mutex::new(state),
            poller: Mutex::new(poller),
            holds_in_flight: Mutex::new(HashSet::new()),
            hold_errors: Mutex::new(HashMap::new()),
            purchase_in_flight: AtomicBool::new(false),
            buyer: RwLock::new(None),
            unit_price: RwLock::new(None),
            confirmation: Mutex::new(None),
            events,
            trigger,
            token,
        };
        (Arc::new(context), sync_rx)
    }

    pub fn now(&self) -> Timestamp {
        Timestamp::new(self.clock.now_millis())
    }

    pub fn is_disposed(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub(crate) fn publish(&self, event: SessionEvent) {
        // no subscribers is fine
        let _ = self.events.send(event);
    }

    pub(crate) async fn epoch(&self) -> u64 {
        self.state.lock().await.map.epoch()
    }

    /// Apply a snapshot fetched at `fetched_at_epoch`. Returns false when it
    /// was stale and discarded.
    pub(crate) async fn apply_snapshot(&self, seats: Vec<Seat>, fetched_at_epoch: u64) -> bool {
        let now = self.now();
        let mut state = self.state.lock().await;
        if self.is_disposed() {
            return true;
        }
        let Some(reconciliation) = state.map.apply_snapshot_from(seats, fetched_at_epoch) else {
            tracing::debug!("Discarding snapshot fetched before a local change");
            return false;
        };
        state.refresh_timers(now);
        drop(state);

        if !reconciliation.dropped.is_empty() {
            tracing::info!("Seats no longer held: {:?}", reconciliation.dropped);
        }
        self.publish(SessionEvent::SeatsChanged {
            dropped: reconciliation.dropped,
        });
        true
    }

    pub(crate) async fn apply_patch(&self, patch: SeatPatch) {
        let now = self.now();
        let mut state = self.state.lock().await;
        if self.is_disposed() {
            return;
        }
        tracing::debug!("Seat {} is now {}", patch.number, patch.state);
        let reconciliation = state.map.apply_patch(patch);
        state.refresh_timers(now);
        drop(state);

        self.publish(SessionEvent::SeatsChanged {
            dropped: reconciliation.dropped,
        });
    }

    pub(crate) async fn confirm_hold(&self, number: SeatNumber) {
        let now = self.now();
        let mut state = self.state.lock().await;
        if self.is_disposed() {
            return;
        }
        state.map.confirm_hold(number);
        state.refresh_timers(now);
        drop(state);

        self.publish(SessionEvent::SeatsChanged {
            dropped: Vec::new(),
        });
    }

    pub(crate) async fn refresh_timers(&self) {
        let now = self.now();
        let mut state = self.state.lock().await;
        if !self.is_disposed() {
            state.refresh_timers(now);
        }
    }

    pub async fn totals(&self) -> Option<PricingTotals> {
        let unit_price = (*self.unit_price.read().await)?;
        let count = self.state.lock().await.map.selected_count();
        Some(PricingTotals::compute(unit_price, count))
    }
}
