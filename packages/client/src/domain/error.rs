//! Domain validation errors.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    /// Seat numbers start at 1
    #[error("Invalid seat number: {0}")]
    InvalidSeatNumber(i64),

    /// National id must be exactly 10 digits
    #[error("National id '{0}' must have exactly 10 digits")]
    InvalidNationalId(String),

    /// Buyer names must not be blank
    #[error("Buyer {0} must not be blank")]
    BlankName(&'static str),
}
