//! Infrastructure layer: REST client, STOMP codec and realtime channel.

pub mod dto;
pub mod http;
pub mod realtime;
pub mod stomp;
