//! UseCase layer: user actions of the purchase view.

pub mod error;
pub mod hold_seat;
pub mod purchase_history;
pub mod purchase_seats;

pub use error::{HistoryError, HoldError, PurchaseError};
pub use hold_seat::{HoldIgnored, HoldOutcome, HoldSeatUseCase};
pub use purchase_history::PurchaseHistoryUseCase;
pub use purchase_seats::{PurchaseDisabled, PurchaseOutcome, PurchaseSeatsUseCase};
