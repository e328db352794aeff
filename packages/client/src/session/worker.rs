//! Background tasks of a session: the sync worker and the realtime event pump.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::{
    infrastructure::realtime::ChannelEvent,
    sync::{poller::Cadence, trigger::SyncReason},
};

use super::{context::SessionContext, event::SessionEvent};

/// Serialize every snapshot fetch of the session.
///
/// Requests queued while a fetch runs are coalesced into one follow-up
/// fetch. A fetch that completes after dispose is discarded.
pub(crate) async fn run_sync_worker(
    context: Arc<SessionContext>,
    mut requests: mpsc::UnboundedReceiver<SyncReason>,
) {
    loop {
        let first = tokio::select! {
            biased;
            _ = context.token.cancelled() => break,
            request = requests.recv() => match request {
                Some(reason) => reason,
                None => break,
            },
        };
        let mut reasons = vec![first];
        while let Ok(reason) = requests.try_recv() {
            reasons.push(reason);
        }
        tracing::debug!("Fetching seat snapshot for {:?}", reasons);

        context.trigger.set_busy(true);
        let epoch = context.epoch().await;
        let result = tokio::select! {
            biased;
            _ = context.token.cancelled() => break,
            result = context.api.fetch_seats(context.event_id) => result,
        };
        context.trigger.set_busy(false);

        if context.is_disposed() {
            break;
        }

        match result {
            Ok(seats) => {
                if !context.apply_snapshot(seats, epoch).await {
                    context.trigger.request(SyncReason::StaleSnapshot);
                }
            }
            Err(e) => {
                tracing::warn!("Seat snapshot failed: {}", e);
                context.refresh_timers().await;
                context.publish(SessionEvent::SyncFailed(e.to_string()));
            }
        }
    }

    context.trigger.set_busy(false);
    tracing::debug!("Sync worker stopped");
}

/// Forward realtime channel events into the session.
pub(crate) async fn run_event_pump(
    context: Arc<SessionContext>,
    mut events: mpsc::UnboundedReceiver<ChannelEvent>,
) {
    loop {
        let event = tokio::select! {
            biased;
            _ = context.token.cancelled() => break,
            event = events.recv() => match event {
                Some(event) => event,
                None => break,
            },
        };

        match event {
            ChannelEvent::Connected => {
                context.poller.lock().await.set_cadence(Cadence::Relaxed);
                context.publish(SessionEvent::RealtimeConnected);
            }
            ChannelEvent::Degraded { reason } => {
                context.poller.lock().await.set_cadence(Cadence::Aggressive);
                context.publish(SessionEvent::RealtimeDegraded(reason));
            }
            ChannelEvent::Patch(patch) => context.apply_patch(patch).await,
        }
    }

    tracing::debug!("Realtime event pump stopped");
}
