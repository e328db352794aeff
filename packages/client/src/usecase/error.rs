//! Errors at the action boundary of the purchase view.

use thiserror::Error;

use crate::domain::{ApiError, SeatNumber};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HoldError {
    /// The ticket service refused or failed the hold
    #[error("Seat {seat}: {message}")]
    Rejected { seat: SeatNumber, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PurchaseError {
    /// The ticket service refused or failed the purchase; the message is the
    /// server's own text when it sent one
    #[error("{0}")]
    Rejected(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HistoryError {
    #[error("No buyer loaded")]
    NoBuyer,

    #[error(transparent)]
    Api(#[from] ApiError),
}
