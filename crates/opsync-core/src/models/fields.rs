//! Lenient field decoding for records arriving from webhooks and listings.
//!
//! Inbound payloads are loosely typed: ids may arrive as `"7"` or `7`, absent
//! optional values are filled with `""` by normalization, and booleans on
//! projects travel as `"True"`/`"False"`. These helpers accept all of those
//! shapes while the models keep strict Rust types.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use super::RemoteId;

/// Read an integer identifier from a JSON number or a numeric string.
pub fn remote_id_from_value(value: &Value) -> Option<RemoteId> {
    match value {
        Value::Number(number) => number.as_i64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(text) => text.trim().is_empty(),
        _ => false,
    }
}

pub fn lenient_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    if is_blank(&value) {
        return Ok(None);
    }
    remote_id_from_value(&value)
        .map(Some)
        .ok_or_else(|| D::Error::custom(format!("expected an integer id, got {value}")))
}

pub fn lenient_local_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    lenient_id(deserializer).map(Option::unwrap_or_default)
}

pub fn lenient_bool<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(false),
        Value::Bool(flag) => Ok(flag),
        Value::Number(number) => Ok(number.as_i64().unwrap_or_default() != 0),
        Value::String(text) => match text.trim().to_ascii_lowercase().as_str() {
            "true" | "1" => Ok(true),
            "false" | "0" | "" => Ok(false),
            other => Err(D::Error::custom(format!("expected a boolean, got {other:?}"))),
        },
        other => Err(D::Error::custom(format!("expected a boolean, got {other}"))),
    }
}

pub fn optional_text<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        Value::String(text) if text.is_empty() => Ok(None),
        Value::String(text) => Ok(Some(text)),
        Value::Number(number) => Ok(Some(number.to_string())),
        other => Err(D::Error::custom(format!("expected text, got {other}"))),
    }
}

pub fn optional_number<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<i64>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    if is_blank(&value) {
        return Ok(None);
    }
    match &value {
        #[allow(clippy::cast_possible_truncation)]
        Value::Number(number) => Ok(number
            .as_i64()
            .or_else(|| number.as_f64().map(|float| float.round() as i64))),
        Value::String(text) => text
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| D::Error::custom(format!("expected a number, got {text:?}"))),
        other => Err(D::Error::custom(format!("expected a number, got {other}"))),
    }
}

pub fn optional_date<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<NaiveDate>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    if is_blank(&value) {
        return Ok(None);
    }
    let Value::String(text) = value else {
        return Err(D::Error::custom(format!("expected a date, got {value}")));
    };
    parse_date(&text)
        .map(Some)
        .ok_or_else(|| D::Error::custom(format!("invalid date: {text:?}")))
}

pub fn optional_datetime<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<DateTime<Utc>>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    if is_blank(&value) {
        return Ok(None);
    }
    let Value::String(text) = value else {
        return Err(D::Error::custom(format!("expected a timestamp, got {value}")));
    };
    parse_datetime(&text)
        .map(Some)
        .ok_or_else(|| D::Error::custom(format!("invalid timestamp: {text:?}")))
}

/// Parse `YYYY-MM-DD`, also accepting a full timestamp and keeping its date.
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .or_else(|| parse_datetime(text).map(|timestamp| timestamp.date_naive()))
}

/// Parse an RFC 3339 timestamp; naive timestamps are taken as UTC.
pub fn parse_datetime(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    DateTime::parse_from_rfc3339(text)
        .map(|timestamp| timestamp.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|naive| naive.and_utc())
        })
}
