//! Row models.
//!
//! Each submodule holds a `FromRow` struct mirroring one table plus the
//! conversions to and from the `fieldmark_core` domain type. JSON-as-text
//! columns are encoded and decoded only here.

pub mod drawing;
pub mod entity;

use serde::de::DeserializeOwned;

/// Decode a JSON text column. Malformed values are logged and dropped.
pub(crate) fn decode_json<T: DeserializeOwned>(
    raw: Option<&str>,
    column: &'static str,
    row_id: &str,
) -> Option<T> {
    let raw = raw?;
    match serde_json::from_str(raw) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(column, id = %row_id, error = %e, "Malformed JSON column, ignoring");
            None
        }
    }
}

/// Decode a text column holding a serde enum name (`"active"`, `"canal"`).
pub(crate) fn decode_enum<T: DeserializeOwned>(
    raw: Option<&str>,
    column: &'static str,
    row_id: &str,
) -> Option<T> {
    let raw = raw?;
    match serde_json::from_value(serde_json::Value::String(raw.to_string())) {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(column, id = %row_id, value = raw, "Unknown enum value, ignoring");
            None
        }
    }
}

/// Encode an enum as its serde name.
pub(crate) fn encode_enum<T: serde::Serialize>(value: &T) -> Result<String, serde_json::Error> {
    match serde_json::to_value(value)? {
        serde_json::Value::String(s) => Ok(s),
        other => Ok(other.to_string()),
    }
}
