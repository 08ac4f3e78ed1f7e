//! Parsing one NDJSON line into a [`ParsedPost`].

use chrono::{DateTime, TimeZone, Utc};
use serde_json::{Number, Value};

use crate::config::IngestConfig;
use crate::error::RecordError;
use crate::table::{ParsedPost, RecordPosition};

/// Parses `line` as a JSON object carrying a numeric epoch-seconds timestamp.
///
/// The timestamp accepts JSON integers, JSON floats (truncated toward zero)
/// and strings holding a decimal integer, as Python's `int()` would. Unlike
/// `int()`, JSON booleans are rejected as `InvalidTimestamp`.
pub fn parse_record(
    line: &str,
    config: &IngestConfig,
    position: RecordPosition,
) -> Result<ParsedPost, RecordError> {
    let value: Value = serde_json::from_str(line)?;
    let Value::Object(mut fields) = value else {
        return Err(RecordError::NotAnObject);
    };

    let raw = fields
        .get(&config.timestamp_field)
        .ok_or_else(|| RecordError::MissingTimestamp(config.timestamp_field.clone()))?;
    let created_utc = epoch_seconds(raw)?;
    let created_datetime = to_utc(created_utc)?;

    // The derived column always wins over a same-named source field.
    if fields.contains_key(&config.datetime_field) {
        fields.retain(|key, _| key != &config.datetime_field);
    }

    Ok(ParsedPost::new(fields, created_utc, created_datetime, position))
}

fn epoch_seconds(raw: &Value) -> Result<i64, RecordError> {
    match raw {
        Value::Number(n) => number_seconds(n),
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| RecordError::InvalidTimestamp(raw.to_string())),
        other => Err(RecordError::InvalidTimestamp(other.to_string())),
    }
}

fn number_seconds(n: &Number) -> Result<i64, RecordError> {
    if let Some(i) = n.as_i64() {
        return Ok(i);
    }
    match n.as_f64() {
        Some(f) if f.is_finite() && f >= i64::MIN as f64 && f < i64::MAX as f64 => {
            Ok(f.trunc() as i64)
        }
        _ => Err(RecordError::InvalidTimestamp(n.to_string())),
    }
}

fn to_utc(seconds: i64) -> Result<DateTime<Utc>, RecordError> {
    Utc.timestamp_opt(seconds, 0)
        .single()
        .ok_or_else(|| RecordError::InvalidTimestamp(seconds.to_string()))
}
