//! Utilities shared by the Encuentro binaries.

pub mod logger;
pub mod time;
