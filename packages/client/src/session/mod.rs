//! Purchase session: the service object behind the seat-hold/purchase view.
//!
//! `PurchaseSession::start` wires the seat map, the sync worker, the fallback
//! poller and the realtime feed together; `dispose` stops all of them. Nothing
//! fetches, ticks or mutates the map after `dispose` returns.

mod context;
mod event;
mod worker;

use std::{sync::Arc, time::Duration};

use tokio::{
    sync::{broadcast, mpsc, watch},
    task::JoinHandle,
};

#[cfg(test)]
pub(crate) use context::test_support;
pub use context::{SessionContext, SessionDeps};
pub use event::{PurchaseConfirmation, Route, SessionEvent};

use crate::{
    config::ConfigError,
    domain::{
        ApiError, Buyer, EventId, EventSummary, Money, PricingTotals, PurchaseRecord, Seat,
        SeatNumber, Timestamp,
    },
    infrastructure::realtime::{ChannelEvent, ChannelState, RealtimeChannel, RealtimeHandle},
    sync::{poller::Cadence, trigger::SyncReason},
    usecase::{
        HistoryError, HoldError, HoldOutcome, HoldSeatUseCase, PurchaseError, PurchaseHistoryUseCase,
        PurchaseOutcome, PurchaseSeatsUseCase,
    },
};

/// Source of realtime seat events for a session.
pub struct RealtimeFeed {
    source: FeedSource,
}

enum FeedSource {
    Channel(RealtimeChannel),
    Detached(mpsc::UnboundedReceiver<ChannelEvent>),
}

impl RealtimeFeed {
    /// Connect a STOMP channel when the session starts.
    pub fn channel(channel: RealtimeChannel) -> Self {
        Self {
            source: FeedSource::Channel(channel),
        }
    }

    /// Feed events from an existing receiver.
    pub fn detached(events: mpsc::UnboundedReceiver<ChannelEvent>) -> Self {
        Self {
            source: FeedSource::Detached(events),
        }
    }
}

pub struct PurchaseSession {
    context: Arc<SessionContext>,
    realtime: Option<RealtimeHandle>,
    tasks: Vec<JoinHandle<()>>,
}

impl PurchaseSession {
    /// Start the session: the first snapshot is requested immediately and the
    /// poller runs at the aggressive cadence until the channel connects.
    ///
    /// Fails without spawning anything when the sync timings are unusable.
    pub async fn start(deps: SessionDeps, feed: RealtimeFeed) -> Result<Self, ConfigError> {
        deps.config.validate()?;
        let (context, sync_rx) = SessionContext::new(deps);

        let (channel_rx, realtime) = match feed.source {
            FeedSource::Channel(channel) => {
                let (tx, rx) = mpsc::unbounded_channel();
                let handle = channel.spawn(tx, &context.token);
                (rx, Some(handle))
            }
            FeedSource::Detached(rx) => (rx, None),
        };

        context.poller.lock().await.set_cadence(Cadence::Aggressive);
        let tasks = vec![
            tokio::spawn(worker::run_sync_worker(Arc::clone(&context), sync_rx)),
            tokio::spawn(worker::run_event_pump(Arc::clone(&context), channel_rx)),
        ];
        context.trigger.request(SyncReason::Initial);
        tracing::info!("Purchase session started for event {}", context.event_id);

        Ok(Self {
            context,
            realtime,
            tasks,
        })
    }

    pub fn context(&self) -> &Arc<SessionContext> {
        &self.context
    }

    pub fn event_id(&self) -> EventId {
        self.context.event_id
    }

    /// Load the event details and take the unit price from them.
    pub async fn load_event(&self) -> Result<EventSummary, ApiError> {
        let summary = self.context.api.fetch_event(self.context.event_id).await?;
        tracing::info!("Event '{}' priced at {}", summary.name, summary.unit_price);
        *self.context.unit_price.write().await = Some(summary.unit_price);
        Ok(summary)
    }

    pub async fn set_unit_price(&self, unit_price: Money) {
        *self.context.unit_price.write().await = Some(unit_price);
    }

    pub async fn set_buyer(&self, buyer: Buyer) {
        *self.context.buyer.write().await = Some(buyer);
    }

    pub async fn buyer(&self) -> Option<Buyer> {
        self.context.buyer.read().await.clone()
    }

    pub async fn hold(&self, number: SeatNumber) -> Result<HoldOutcome, HoldError> {
        HoldSeatUseCase::new(Arc::clone(&self.context))
            .execute(number)
            .await
    }

    pub async fn purchase(&self) -> Result<PurchaseOutcome, PurchaseError> {
        PurchaseSeatsUseCase::new(Arc::clone(&self.context))
            .execute()
            .await
    }

    pub async fn history(&self) -> Result<Vec<PurchaseRecord>, HistoryError> {
        PurchaseHistoryUseCase::new(Arc::clone(&self.context))
            .execute()
            .await
    }

    pub async fn totals(&self) -> Option<PricingTotals> {
        self.context.totals().await
    }

    /// Seats ordered by number
    pub async fn seats(&self) -> Vec<Seat> {
        self.context.state.lock().await.map.seats().cloned().collect()
    }

    pub async fn selection(&self) -> Vec<SeatNumber> {
        self.context.state.lock().await.map.selected()
    }

    /// Remaining-seconds feed of a held seat.
    pub async fn countdown(&self, number: SeatNumber) -> Option<watch::Receiver<u64>> {
        self.context.state.lock().await.countdowns.subscribe(number)
    }

    pub async fn remaining_secs(&self, number: SeatNumber) -> Option<u64> {
        self.context.state.lock().await.countdowns.remaining(number)
    }

    pub async fn running_countdowns(&self) -> usize {
        self.context.state.lock().await.countdowns.running_count()
    }

    /// Expiry the scheduler is currently armed for.
    pub async fn armed_expiry(&self) -> Option<Timestamp> {
        self.context.state.lock().await.scheduler.armed_for()
    }

    pub async fn hold_error(&self, number: SeatNumber) -> Option<String> {
        self.context.hold_errors.lock().await.get(&number).cloned()
    }

    pub async fn is_hold_in_flight(&self, number: SeatNumber) -> bool {
        self.context.holds_in_flight.lock().await.contains(&number)
    }

    pub async fn confirmation(&self) -> Option<PurchaseConfirmation> {
        self.context.confirmation.lock().await.clone()
    }

    pub async fn poll_interval(&self) -> Option<Duration> {
        self.context.poller.lock().await.current_interval()
    }

    pub fn realtime_state(&self) -> ChannelState {
        self.realtime
            .as_ref()
            .map_or(ChannelState::Disconnected, RealtimeHandle::state)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.context.subscribe()
    }

    /// Stop every task and timer of the session and tear the channel down.
    pub async fn dispose(mut self) {
        tracing::info!("Disposing purchase session for event {}", self.context.event_id);
        self.context.token.cancel();

        if let Some(realtime) = self.realtime.take() {
            realtime.teardown().await;
        }
        for task in std::mem::take(&mut self.tasks) {
            if let Err(e) = task.await {
                tracing::warn!("Session task ended abnormally: {}", e);
            }
        }

        self.context.state.lock().await.stop_timers();
        self.context.poller.lock().await.stop();
    }
}

impl Drop for PurchaseSession {
    fn drop(&mut self) {
        self.context.token.cancel();
    }
}
