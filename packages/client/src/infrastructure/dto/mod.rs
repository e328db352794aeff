//! Data Transfer Objects (DTOs) for the ticket services.
//!
//! DTOs are organized by protocol:
//! - `rest`: REST request/response DTOs
//! - `realtime`: STOMP message payloads
//! - `envelope`: response envelope normalization

pub mod conversion;
pub mod envelope;
pub mod realtime;
pub mod rest;
