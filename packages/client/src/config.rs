//! Client configuration: service endpoints and synchronization tunables.

use std::time::Duration;

use thiserror::Error;

use crate::domain::EventId;

pub const DEFAULT_API_URL: &str = "http://localhost:8000/api";
pub const DEFAULT_TICKETS_URL: &str = "http://localhost:8082/api";
pub const DEFAULT_WS_URL: &str = "ws://localhost:8082/ws/websocket";

/// Base URLs of the collaborating services.
///
/// The ticket service runs on its own host/port, separate from the API
/// gateway that fronts the events service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    /// API gateway base (events service)
    pub api_url: String,
    /// Ticket/seat service base
    pub tickets_url: String,
    /// STOMP WebSocket endpoint
    pub ws_url: String,
    /// Bearer token attached to REST calls
    pub auth_token: Option<String>,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            tickets_url: DEFAULT_TICKETS_URL.to_string(),
            ws_url: DEFAULT_WS_URL.to_string(),
            auth_token: None,
        }
    }
}

impl Endpoints {
    pub fn seats_url(&self, event_id: EventId) -> String {
        format!("{}/eventos/{}/asientos", trim(&self.tickets_url), event_id)
    }

    pub fn holds_url(&self) -> String {
        format!("{}/holds", trim(&self.tickets_url))
    }

    pub fn purchases_url(&self) -> String {
        format!("{}/purchases", trim(&self.tickets_url))
    }

    pub fn history_url(&self, national_id: &str) -> String {
        format!("{}/compras/{}", trim(&self.tickets_url), national_id)
    }

    pub fn event_url(&self, event_id: EventId) -> String {
        format!("{}/ms-eventos/api/eventos/{}", trim(&self.api_url), event_id)
    }
}

/// STOMP destination carrying seat updates of one event.
pub fn seat_topic(event_id: EventId) -> String {
    format!("/topic/eventos/{}/asientos", event_id)
}

fn trim(url: &str) -> &str {
    url.trim_end_matches('/')
}

/// Timing of the synchronization machinery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Poll interval while the realtime channel is healthy
    pub relaxed_poll_interval: Duration,
    /// Poll interval while the realtime channel is degraded or never connected
    pub aggressive_poll_interval: Duration,
    /// Added to the soonest hold expiry to tolerate clock skew
    pub expiry_buffer: Duration,
    /// Fixed delay between realtime reconnection attempts
    pub reconnect_delay: Duration,
    /// Delay before leaving the purchase view after a successful purchase
    pub redirect_delay: Duration,
}

/// Timing combinations the synchronization machinery cannot run with
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{0} must be greater than zero")]
    ZeroInterval(&'static str),

    #[error(
        "relaxed poll interval ({relaxed:?}) must be longer than the aggressive one ({aggressive:?})"
    )]
    CadenceOrder {
        relaxed: Duration,
        aggressive: Duration,
    },
}

impl SyncConfig {
    /// Both poll intervals are non-zero and losing the realtime channel
    /// strictly shortens the interval.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.relaxed_poll_interval.is_zero() {
            return Err(ConfigError::ZeroInterval("relaxed poll interval"));
        }
        if self.aggressive_poll_interval.is_zero() {
            return Err(ConfigError::ZeroInterval("aggressive poll interval"));
        }
        if self.relaxed_poll_interval <= self.aggressive_poll_interval {
            return Err(ConfigError::CadenceOrder {
                relaxed: self.relaxed_poll_interval,
                aggressive: self.aggressive_poll_interval,
            });
        }
        Ok(())
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            relaxed_poll_interval: Duration::from_secs(30),
            aggressive_poll_interval: Duration::from_secs(5),
            expiry_buffer: Duration::from_millis(1_500),
            reconnect_delay: Duration::from_secs(5),
            redirect_delay: Duration::from_secs(3),
        }
    }
}
