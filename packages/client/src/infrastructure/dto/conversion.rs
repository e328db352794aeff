//! Conversion logic between DTOs and domain entities.

use chrono::{DateTime, NaiveDateTime};
use uuid::Uuid;

use crate::domain::{
    ApiError, DomainError, EventId, EventSummary, Invoice, Money, PurchaseRecord, PurchaseRequest,
    Seat, SeatNumber, SeatPatch, SeatState, TicketLine, Timestamp,
};
use crate::infrastructure::dto::{
    realtime::SeatUpdateDto,
    rest::{
        EventDto, InvoiceDto, PurchaseRecordDto, PurchaseRequestDto, RawAmount, RawTimestamp,
        SeatViewDto, TicketInfoDto,
    },
};

/// Epoch numbers above this are milliseconds, below it seconds.
const EPOCH_MILLIS_THRESHOLD: f64 = 100_000_000_000.0;

/// Parse a server timestamp.
///
/// Unparsable values yield `None`: the seat is then treated as having an
/// unknown expiry and no timer is armed for it.
pub fn parse_timestamp(raw: &RawTimestamp) -> Option<Timestamp> {
    let parsed = match raw {
        RawTimestamp::Text(text) => parse_timestamp_text(text.trim()),
        RawTimestamp::Number(value) if value.is_finite() => {
            let millis = if value.abs() >= EPOCH_MILLIS_THRESHOLD {
                *value
            } else {
                value * 1000.0
            };
            Some(Timestamp::new(millis.round() as i64))
        }
        RawTimestamp::Number(_) => None,
    };

    if parsed.is_none() {
        tracing::warn!("Ignoring unparsable hold expiry: {:?}", raw);
    }
    parsed
}

fn parse_timestamp_text(text: &str) -> Option<Timestamp> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(Timestamp::new(dt.timestamp_millis()));
    }
    // LocalDateTime without offset: the services run in UTC
    NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| Timestamp::new(naive.and_utc().timestamp_millis()))
}

pub fn parse_amount(raw: &RawAmount) -> Result<Money, ApiError> {
    match raw {
        RawAmount::Number(value) if value.is_finite() => Ok(Money::from_decimal(*value)),
        RawAmount::Text(text) => text
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|value| value.is_finite())
            .map(Money::from_decimal)
            .ok_or_else(|| ApiError::Decode(format!("invalid amount '{}'", text))),
        RawAmount::Number(value) => Err(ApiError::Decode(format!("invalid amount {}", value))),
    }
}

fn parse_uuid(raw: Option<&str>) -> Option<Uuid> {
    raw.and_then(|value| Uuid::parse_str(value).ok())
}

fn seat_number(value: i64) -> Result<SeatNumber, ApiError> {
    SeatNumber::try_from(value).map_err(|e| ApiError::Decode(e.to_string()))
}

// ========================================
// DTO → Domain Entity
// ========================================

impl TryFrom<SeatViewDto> for Seat {
    type Error = DomainError;

    fn try_from(dto: SeatViewDto) -> Result<Self, Self::Error> {
        Ok(Self {
            number: SeatNumber::try_from(dto.numero)?,
            state: SeatState::parse(&dto.estado),
            hold_expires_at: dto.hold_until.as_ref().and_then(parse_timestamp),
            record_id: parse_uuid(dto.asiento_id.as_deref()),
        })
    }
}

impl TryFrom<SeatUpdateDto> for SeatPatch {
    type Error = DomainError;

    fn try_from(dto: SeatUpdateDto) -> Result<Self, Self::Error> {
        Ok(Self {
            number: SeatNumber::try_from(dto.asiento)?,
            state: SeatState::parse(&dto.estado),
            hold_expires_at: dto.hold_until.as_ref().and_then(parse_timestamp),
        })
    }
}

impl TryFrom<InvoiceDto> for Invoice {
    type Error = ApiError;

    fn try_from(dto: InvoiceDto) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(dto.factura_id.as_deref()),
            event_id: EventId::new(dto.id_evento),
            seats: dto
                .asientos
                .into_iter()
                .map(seat_number)
                .collect::<Result<_, _>>()?,
            unit_price: parse_amount(&dto.precio_unitario)?,
            subtotal: parse_amount(&dto.subtotal)?,
            tax: parse_amount(&dto.iva)?,
            total: parse_amount(&dto.total)?,
            created_at: dto.created_at.as_ref().and_then(parse_timestamp),
        })
    }
}

impl TryFrom<TicketInfoDto> for TicketLine {
    type Error = ApiError;

    fn try_from(dto: TicketInfoDto) -> Result<Self, Self::Error> {
        Ok(Self {
            ticket_id: parse_uuid(dto.ticket_id.as_deref()),
            seat: seat_number(dto.numero_asiento)?,
            unit_price: parse_amount(&dto.precio_unitario)?,
        })
    }
}

impl TryFrom<PurchaseRecordDto> for PurchaseRecord {
    type Error = ApiError;

    fn try_from(dto: PurchaseRecordDto) -> Result<Self, Self::Error> {
        Ok(Self {
            invoice_id: parse_uuid(dto.factura_id.as_deref()),
            event_id: EventId::new(dto.id_evento),
            tickets: dto
                .tickets
                .into_iter()
                .map(TicketLine::try_from)
                .collect::<Result<_, _>>()?,
            subtotal: parse_amount(&dto.subtotal)?,
            tax: parse_amount(&dto.iva)?,
            total: parse_amount(&dto.total)?,
            purchased_at: dto.fecha_compra.as_ref().and_then(parse_timestamp),
        })
    }
}

/// Build an event summary; the requested id stands in when the body omits it.
pub fn event_summary_from_dto(dto: EventDto, requested: EventId) -> Result<EventSummary, ApiError> {
    Ok(EventSummary {
        id: dto.id_evento.map(EventId::new).unwrap_or(requested),
        name: dto.nombre,
        unit_price: parse_amount(&dto.precio)?,
        venue: dto.establecimiento,
        date: dto.fecha,
    })
}

// ========================================
// Domain Entity → DTO
// ========================================

impl From<&PurchaseRequest> for PurchaseRequestDto {
    fn from(request: &PurchaseRequest) -> Self {
        Self {
            id_evento: request.event_id.value(),
            asientos: request.seats.iter().map(SeatNumber::value).collect(),
            nombre: request.buyer.first_name.clone(),
            apellido: request.buyer.last_name.clone(),
            cedula: request.buyer.national_id.as_str().to_string(),
            precio_unitario: request.unit_price.as_decimal(),
        }
    }
}
