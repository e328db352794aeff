//! Interactive seat-hold and purchase client for one Encuentro event.
//!
//! Loads the seat map of the event, keeps it live over STOMP (with a REST
//! polling fallback) and lets the user hold seats and buy them.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin encuentro-client -- --event-id 3 \
//!     --first-name Ana --last-name Pérez --national-id 1712345678
//! ```

use std::time::Duration;

use clap::Parser;

use encuentro_client::{
    config::{DEFAULT_API_URL, DEFAULT_TICKETS_URL, DEFAULT_WS_URL, Endpoints, SyncConfig},
    domain::{Buyer, EventId, Money},
    error::ClientError,
    ui::{ClientOptions, run_client},
};
use encuentro_shared::logger::setup_logger;

#[derive(Parser, Debug)]
#[command(name = "encuentro-client")]
#[command(about = "Real-time seat hold and purchase client for Encuentro events", long_about = None)]
struct Args {
    /// Event whose seats are shown
    #[arg(short = 'e', long, env = "ENCUENTRO_EVENT_ID")]
    event_id: i64,

    /// API gateway base URL (events service)
    #[arg(long, env = "ENCUENTRO_API_URL", default_value = DEFAULT_API_URL)]
    api_url: String,

    /// Ticket service base URL
    #[arg(long, env = "ENCUENTRO_TICKETS_URL", default_value = DEFAULT_TICKETS_URL)]
    tickets_url: String,

    /// STOMP WebSocket endpoint
    #[arg(long, env = "ENCUENTRO_WS_URL", default_value = DEFAULT_WS_URL)]
    ws_url: String,

    /// Bearer token for REST calls
    #[arg(long, env = "ENCUENTRO_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Buyer first name
    #[arg(long, env = "ENCUENTRO_FIRST_NAME")]
    first_name: Option<String>,

    /// Buyer last name
    #[arg(long, env = "ENCUENTRO_LAST_NAME")]
    last_name: Option<String>,

    /// Buyer national id (cédula, 10 digits)
    #[arg(long, env = "ENCUENTRO_NATIONAL_ID")]
    national_id: Option<String>,

    /// Unit price used when the events API cannot be reached
    #[arg(long)]
    unit_price: Option<f64>,

    /// Poll interval while live updates work (seconds)
    #[arg(long, default_value_t = 30)]
    relaxed_poll_secs: u64,

    /// Poll interval while live updates are down (seconds)
    #[arg(long, default_value_t = 5)]
    aggressive_poll_secs: u64,

    /// Grace added to the soonest hold expiry (milliseconds)
    #[arg(long, default_value_t = 1_500)]
    expiry_buffer_ms: u64,

    /// Delay between realtime reconnection attempts (seconds)
    #[arg(long, default_value_t = 5)]
    reconnect_secs: u64,
}

impl Args {
    fn buyer(&self) -> Result<Option<Buyer>, ClientError> {
        match (&self.first_name, &self.last_name, &self.national_id) {
            (Some(first), Some(last), Some(id)) => Ok(Some(Buyer::new(first, last, id)?)),
            (None, None, None) => Ok(None),
            _ => Err(ClientError::InvalidArgument(
                "--first-name, --last-name and --national-id must be given together".to_string(),
            )),
        }
    }

    fn into_options(self) -> Result<ClientOptions, ClientError> {
        let buyer = self.buyer()?;
        let fallback_unit_price = match self.unit_price {
            Some(price) if !price.is_finite() || price < 0.0 => {
                return Err(ClientError::InvalidArgument(format!(
                    "--unit-price must be a non-negative amount, got {}",
                    price
                )));
            }
            price => price.map(Money::from_decimal),
        };

        let sync = SyncConfig {
            relaxed_poll_interval: Duration::from_secs(self.relaxed_poll_secs),
            aggressive_poll_interval: Duration::from_secs(self.aggressive_poll_secs),
            expiry_buffer: Duration::from_millis(self.expiry_buffer_ms),
            reconnect_delay: Duration::from_secs(self.reconnect_secs),
            ..SyncConfig::default()
        };
        sync.validate().map_err(|e| {
            ClientError::InvalidArgument(format!(
                "--relaxed-poll-secs / --aggressive-poll-secs: {}",
                e
            ))
        })?;

        Ok(ClientOptions {
            event_id: EventId::new(self.event_id),
            endpoints: Endpoints {
                api_url: self.api_url,
                tickets_url: self.tickets_url,
                ws_url: self.ws_url,
                auth_token: self.token,
            },
            sync,
            buyer,
            fallback_unit_price,
        })
    }
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), "info");

    let args = Args::parse();

    let options = match args.into_options() {
        Ok(options) => options,
        Err(e) => {
            tracing::error!("{}", e);
            std::process::exit(2);
        }
    };

    if let Err(e) = run_client(options).await {
        tracing::error!("Client error: {}", e);
        std::process::exit(1);
    }
}
