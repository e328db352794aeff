//! Domain layer: seats, selection, pricing and the remote API seam.

mod buyer;
mod error;
mod pricing;
mod seat;
mod seat_map;
mod ticket_api;
mod value_object;

pub use buyer::Buyer;
pub use error::DomainError;
pub use pricing::{PricingTotals, TAX_RATE_BASIS_POINTS};
pub use seat::{Seat, SeatPatch, SeatState};
pub use seat_map::{Reconciliation, SeatMap};
#[cfg(test)]
pub use ticket_api::MockTicketApi;
pub use ticket_api::{
    ApiError, EventSummary, Invoice, PurchaseRecord, PurchaseRequest, TicketApi, TicketLine,
};
pub use value_object::{EventId, Money, NationalId, SeatNumber, Timestamp};
