//! Seat-hold and purchase synchronization client for the Encuentro ticketing
//! services.
//!
//! The seat map of one event is kept in sync from a REST snapshot, a STOMP
//! realtime feed and a polling fallback, while hold and purchase actions race
//! server-side hold expiries.

// layers
pub mod domain;
pub mod infrastructure;
pub mod session;
pub mod sync;
pub mod ui;
pub mod usecase;

pub mod config;
pub mod error;
