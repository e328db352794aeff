//! Seat entity and its server-authoritative state.

use std::fmt;

use uuid::Uuid;

use super::value_object::{SeatNumber, Timestamp};

/// Seat state as reported by the ticket service.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SeatState {
    Available,
    Hold,
    Sold,
    /// Any other value the server sends; never interactive.
    Unknown(String),
}

impl SeatState {
    /// Parse the server's enumeration. `PURCHASED` is the ticket service's
    /// spelling of `SOLD`.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "AVAILABLE" => Self::Available,
            "HOLD" => Self::Hold,
            "SOLD" | "PURCHASED" => Self::Sold,
            _ => Self::Unknown(raw.to_string()),
        }
    }

    pub fn is_hold(&self) -> bool {
        matches!(self, Self::Hold)
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available)
    }
}

impl fmt::Display for SeatState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Available => f.write_str("AVAILABLE"),
            Self::Hold => f.write_str("HOLD"),
            Self::Sold => f.write_str("SOLD"),
            Self::Unknown(raw) => write!(f, "UNKNOWN({})", raw),
        }
    }
}

/// One inventory slot of an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Seat {
    pub number: SeatNumber,
    pub state: SeatState,
    pub hold_expires_at: Option<Timestamp>,
    /// Server-side record id, carried through but never used as identity.
    pub record_id: Option<Uuid>,
}

impl Seat {
    pub fn new(number: SeatNumber, state: SeatState, hold_expires_at: Option<Timestamp>) -> Self {
        Self {
            number,
            state,
            hold_expires_at,
            record_id: None,
        }
    }

    /// Expiry usable for scheduling: only a seat in `HOLD` carries one.
    pub fn trusted_expiry(&self) -> Option<Timestamp> {
        if self.state.is_hold() {
            self.hold_expires_at
        } else {
            None
        }
    }
}

/// Incremental realtime update for a single seat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeatPatch {
    pub number: SeatNumber,
    pub state: SeatState,
    pub hold_expires_at: Option<Timestamp>,
}
