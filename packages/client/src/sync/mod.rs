//! Timing machinery that keeps the seat map converging on the server state.
//!
//! - `trigger`: requests for the single sync worker
//! - `scheduler`: one timer at the soonest hold expiry
//! - `poller`: periodic fallback snapshot requests
//! - `countdown`: per-seat remaining-time tickers

pub mod countdown;
pub mod poller;
pub mod scheduler;
pub mod trigger;

pub use countdown::{CountdownBoard, format_remaining};
pub use poller::{Cadence, FallbackPoller};
pub use scheduler::ExpiryScheduler;
pub use trigger::{SyncReason, SyncTrigger};
