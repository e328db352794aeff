//! REST DTOs of the ticket service and the events API.
//!
//! Field names follow the services' JSON (Spanish, camelCase). The English
//! names used by other clients are accepted as aliases.

use serde::{Deserialize, Serialize};

/// Timestamp as the services serialize it: ISO-8601 text or an epoch number.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RawTimestamp {
    Text(String),
    Number(f64),
}

/// Amount sent either as a JSON number or as a decimal string.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RawAmount {
    Number(f64),
    Text(String),
}

/// Seat entry of `GET /eventos/{id}/asientos`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeatViewDto {
    #[serde(default, alias = "seatRecordId")]
    pub asiento_id: Option<String>,
    #[serde(alias = "number")]
    pub numero: i64,
    #[serde(alias = "state")]
    pub estado: String,
    #[serde(default, alias = "holdExpiresAt")]
    pub hold_until: Option<RawTimestamp>,
}

/// Body of `POST /holds`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HoldSeatsRequestDto {
    pub id_evento: i64,
    pub asientos: Vec<u32>,
}

/// Body of `POST /purchases`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseRequestDto {
    pub id_evento: i64,
    pub asientos: Vec<u32>,
    pub nombre: String,
    pub apellido: String,
    pub cedula: String,
    pub precio_unitario: f64,
}

/// Invoice returned by `POST /purchases`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceDto {
    #[serde(default)]
    pub factura_id: Option<String>,
    pub id_evento: i64,
    #[serde(default)]
    pub asientos: Vec<i64>,
    pub precio_unitario: RawAmount,
    pub subtotal: RawAmount,
    pub iva: RawAmount,
    pub total: RawAmount,
    #[serde(default)]
    pub created_at: Option<RawTimestamp>,
}

/// Ticket line of a purchase history entry
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketInfoDto {
    #[serde(default)]
    pub ticket_id: Option<String>,
    pub numero_asiento: i64,
    pub precio_unitario: RawAmount,
}

/// Entry of `GET /compras/{cedula}`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseRecordDto {
    #[serde(default)]
    pub factura_id: Option<String>,
    pub id_evento: i64,
    #[serde(default)]
    pub tickets: Vec<TicketInfoDto>,
    pub subtotal: RawAmount,
    pub iva: RawAmount,
    pub total: RawAmount,
    #[serde(default)]
    pub fecha_compra: Option<RawTimestamp>,
}

/// Event of `GET /ms-eventos/api/eventos/{id}`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDto {
    #[serde(default, alias = "id")]
    pub id_evento: Option<i64>,
    pub nombre: String,
    pub precio: RawAmount,
    #[serde(default)]
    pub establecimiento: Option<String>,
    #[serde(default)]
    pub fecha: Option<String>,
}

/// Error body the services return on failure.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ErrorBodyDto {
    #[serde(default)]
    pub mensaje: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ErrorBodyDto {
    /// First non-blank message, preferring the service's own `mensaje`.
    pub fn into_message(self) -> Option<String> {
        [self.mensaje, self.message, self.error]
            .into_iter()
            .flatten()
            .find(|m| !m.trim().is_empty())
    }
}
