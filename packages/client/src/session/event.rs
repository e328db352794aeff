//! Notifications published by a purchase session to its view.

use crate::domain::{Invoice, SeatNumber};

/// Destinations the view may be asked to navigate to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    PurchaseHistory,
}

/// Recorded after a successful purchase.
#[derive(Debug, Clone, PartialEq)]
pub struct PurchaseConfirmation {
    pub invoice: Invoice,
    pub seat_count: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// The seat map changed; `dropped` lists seats that left the selection
    SeatsChanged { dropped: Vec<SeatNumber> },
    RealtimeConnected,
    RealtimeDegraded(String),
    /// A background snapshot fetch failed; the map is unchanged
    SyncFailed(String),
    HoldFailed { seat: SeatNumber, message: String },
    Purchased(PurchaseConfirmation),
    PurchaseFailed(String),
    Navigate(Route),
}
