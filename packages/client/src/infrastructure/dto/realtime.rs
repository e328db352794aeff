//! Realtime channel payloads.

use serde::Deserialize;

use super::rest::RawTimestamp;

/// Body of a MESSAGE frame on `/topic/eventos/{id}/asientos`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeatUpdateDto {
    #[serde(default, alias = "eventId")]
    pub id_evento: Option<i64>,
    #[serde(alias = "seatNumber")]
    pub asiento: i64,
    #[serde(alias = "state")]
    pub estado: String,
    #[serde(default, alias = "holdExpiresAt")]
    pub hold_until: Option<RawTimestamp>,
}
