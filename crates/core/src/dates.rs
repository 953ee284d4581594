//! Timestamp normalization.
//!
//! All timestamps are kept at microsecond precision so values survive a
//! round-trip through Postgres `TIMESTAMPTZ` unchanged. Client-supplied dates
//! are parsed leniently. An unreadable required date becomes "now" and an
//! unreadable optional one is dropped, both with a warning.

use chrono::{DateTime, NaiveDateTime, SubsecRound, TimeZone, Utc};
use serde_json::Value;

use crate::types::Timestamp;

/// Current time truncated to microseconds.
pub fn now() -> Timestamp {
    truncate(Utc::now())
}

/// Truncate to microseconds.
pub fn truncate(ts: Timestamp) -> Timestamp {
    ts.trunc_subsecs(6)
}

/// Parse a client-supplied date.
///
/// Accepts RFC 3339 strings, naive `YYYY-MM-DDTHH:MM:SS[.fff]` strings
/// (taken as UTC), and epoch milliseconds. Missing or null values yield
/// `fallback` silently; malformed values yield `fallback` with a warning.
pub fn parse_lenient(value: Option<&Value>, field: &'static str, fallback: Timestamp) -> Timestamp {
    match value {
        None | Some(Value::Null) => fallback,
        Some(v) => match parse_value(v) {
            Some(ts) => truncate(ts),
            None => {
                tracing::warn!(field, value = %v, "Invalid date, using current time");
                fallback
            }
        },
    }
}

/// Optional variant of [`parse_lenient`]: missing or malformed values are
/// `None`.
pub fn parse_optional(value: Option<&Value>, field: &'static str) -> Option<Timestamp> {
    match value {
        None | Some(Value::Null) => None,
        Some(v) => {
            let parsed = parse_value(v).map(truncate);
            if parsed.is_none() {
                tracing::warn!(field, value = %v, "Invalid date, dropping it");
            }
            parsed
        }
    }
}

fn parse_value(v: &Value) -> Option<Timestamp> {
    match v {
        Value::String(s) => parse_str(s),
        Value::Number(n) => n.as_i64().and_then(|ms| Utc.timestamp_millis_opt(ms).single()),
        _ => None,
    }
}

fn parse_str(s: &str) -> Option<Timestamp> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Some(ts.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|naive| naive.and_utc())
}
