//! Response envelope normalization.
//!
//! The services answer either with the bare payload or wrapped in
//! `{ "mensaje": ..., "respuesta": <payload> }` (some gateways use `data`).
//! This module is the single place that knows those shapes:
//!
//! 1. an object with a non-null `respuesta` field unwraps to that field,
//! 2. otherwise an object with a non-null `data` field unwraps to it,
//! 3. otherwise the value is the payload itself.
//!
//! Anything else that does not decode into the expected type is a
//! `ApiError::Decode`, logged with the offending shape.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::domain::ApiError;

use super::rest::SeatViewDto;

const ENVELOPE_FIELDS: [&str; 2] = ["respuesta", "data"];

/// Strip a known envelope, if present.
pub fn unwrap_envelope(value: Value) -> Value {
    match value {
        Value::Object(mut map) => {
            for field in ENVELOPE_FIELDS {
                if let Some(inner) = map.remove(field).filter(|inner| !inner.is_null()) {
                    return inner;
                }
            }
            Value::Object(map)
        }
        other => other,
    }
}

/// Decode an enveloped or bare payload.
pub fn decode_payload<T: DeserializeOwned>(value: Value, what: &str) -> Result<T, ApiError> {
    let payload = unwrap_envelope(value);
    serde_json::from_value(payload.clone()).map_err(|e| {
        tracing::warn!(
            "Unexpected {} payload ({}): {}",
            what,
            describe_shape(&payload),
            e
        );
        ApiError::Decode(format!("{}: {}", what, e))
    })
}

/// Normalize a seat snapshot response into its seat entries.
///
/// A snapshot is all-or-nothing: one malformed entry rejects the whole
/// snapshot so a partially decoded map never prunes the selection.
pub fn normalize_seat_snapshot(value: Value) -> Result<Vec<SeatViewDto>, ApiError> {
    decode_payload(value, "seat snapshot")
}

fn describe_shape(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(_) => "boolean".to_string(),
        Value::Number(_) => "number".to_string(),
        Value::String(_) => "string".to_string(),
        Value::Array(items) => format!("array of {}", items.len()),
        Value::Object(map) => format!(
            "object with keys [{}]",
            map.keys().cloned().collect::<Vec<_>>().join(", ")
        ),
    }
}
