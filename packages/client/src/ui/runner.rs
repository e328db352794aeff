//! Client execution: wire the services together and run the view.

use std::sync::Arc;

use encuentro_shared::time::SystemClock;

use crate::{
    config::{Endpoints, SyncConfig},
    domain::{Buyer, EventId, Money},
    error::ClientError,
    infrastructure::{http::HttpTicketApi, realtime::RealtimeChannel},
    session::{PurchaseSession, RealtimeFeed, SessionDeps},
};

use super::{formatter::SeatFormatter, session::run_purchase_view};

/// Everything the binary collected from its arguments.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub event_id: EventId,
    pub endpoints: Endpoints,
    pub sync: SyncConfig,
    pub buyer: Option<Buyer>,
    /// Used when the events API cannot price the event
    pub fallback_unit_price: Option<Money>,
}

/// Run the purchase view for one event until the user quits.
pub async fn run_client(options: ClientOptions) -> Result<(), ClientError> {
    let api = Arc::new(HttpTicketApi::new(options.endpoints.clone())?);
    let channel = RealtimeChannel::new(
        options.endpoints.ws_url.clone(),
        options.event_id,
        options.sync.reconnect_delay,
    );

    let session = PurchaseSession::start(
        SessionDeps {
            event_id: options.event_id,
            api,
            clock: Arc::new(SystemClock),
            config: options.sync,
        },
        RealtimeFeed::channel(channel),
    )
    .await?;

    match session.load_event().await {
        Ok(summary) => print!("{}", SeatFormatter::format_event(&summary)),
        Err(e) => match options.fallback_unit_price {
            Some(price) => {
                tracing::warn!("Could not load event {}: {}", options.event_id, e);
                session.set_unit_price(price).await;
            }
            None => {
                tracing::warn!(
                    "Could not load event {} and no --unit-price given; purchases stay disabled: {}",
                    options.event_id,
                    e
                );
            }
        },
    }

    match options.buyer {
        Some(buyer) => {
            tracing::info!(
                "Buying as {} {} ({})",
                buyer.first_name,
                buyer.last_name,
                buyer.national_id
            );
            session.set_buyer(buyer).await;
        }
        None => tracing::warn!("No buyer details given; purchases stay disabled"),
    }

    run_purchase_view(session).await;
    tracing::info!("Client session ended normally");
    Ok(())
}
