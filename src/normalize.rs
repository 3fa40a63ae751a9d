/// Upstream-response normalization.
///
/// The upstream returns heterogeneous JSON: a `{results: [...], search:
/// {...}}` page envelope, a bare object for id-addressed lookups, or a bare
/// array. Record shape varies too — the location may sit in `locatedAt`, in
/// `groupBasedAt`, in a `locatedAt` nested inside `groupBasedAt`, or be
/// missing entirely, and the record timestamp may be a `datetime` or a
/// `lastModifiedDate` field with different formats. This module flattens all
/// of that into uniform `Record`s.
///
/// Fallbacks are reserved for documented absence: a missing location yields
/// the degenerate (0, 0) point and a missing timestamp yields `None`, but a
/// location missing an ordinate or a timestamp in an unexpected format is a
/// `Parse` error rather than silently corrupt output.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::{Map, Value};

use crate::model::{AdapterError, PointGeometry, Record, FMT_DATETIME_OFFSET, FMT_DATETIME_ZULU};

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Normalize a raw upstream response into records.
///
/// An empty result array yields an empty vec, not an error.
pub fn normalize(raw: &Value) -> Result<Vec<Record>, AdapterError> {
    let rows: Vec<&Value> = match raw {
        Value::Null => Vec::new(),
        Value::Array(items) => items.iter().collect(),
        Value::Object(object) => match object.get("results") {
            Some(Value::Array(items)) => items.iter().collect(),
            Some(other) => {
                return Err(AdapterError::Parse(format!(
                    "'results' should be an array, got {}",
                    json_kind(other)
                )))
            }
            // No results envelope: the whole object is the one-and-only
            // record (id-addressed lookups).
            None => vec![raw],
        },
        other => {
            return Err(AdapterError::Parse(format!(
                "response body should be an object or array, got {}",
                json_kind(other)
            )))
        }
    };

    rows.into_iter().map(normalize_record).collect()
}

fn normalize_record(row: &Value) -> Result<Record, AdapterError> {
    let object = row.as_object().ok_or_else(|| {
        AdapterError::Parse(format!("result row should be an object, got {}", json_kind(row)))
    })?;

    let id = extract_id(object);
    let (lon, lat, consumed_location) = extract_location(object)?;
    let (datetime, datetime_consumed) = extract_datetime(object)?;

    let mut properties = object.clone();
    if let Some(key) = consumed_location {
        properties.remove(key);
    }
    if datetime_consumed {
        // The promoted value must not also appear as a raw property — it
        // would represent the same instant twice with different types.
        properties.remove("datetime");
    }

    Ok(Record {
        id,
        geometry: PointGeometry::new(lon, lat),
        datetime,
        properties,
    })
}

// ---------------------------------------------------------------------------
// Field extraction
// ---------------------------------------------------------------------------

fn extract_id(object: &Map<String, Value>) -> Option<String> {
    match object.get("id") {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}

/// Location extraction, in priority order: `locatedAt`, then `groupBasedAt`
/// (itself possibly wrapping a nested `locatedAt`), then the degenerate
/// (0, 0) fallback for records with no location at all.
///
/// Returns (lon, lat, consumed key).
fn extract_location(
    object: &Map<String, Value>,
) -> Result<(f64, f64, Option<&'static str>), AdapterError> {
    if let Some(location) = present_object(object.get("locatedAt")) {
        let (lon, lat) = read_ordinates(location, "locatedAt")?;
        return Ok((lon, lat, Some("locatedAt")));
    }

    if let Some(group) = present_object(object.get("groupBasedAt")) {
        let location = match present_object(group.get("locatedAt")) {
            Some(nested) => nested,
            None => group,
        };
        let (lon, lat) = read_ordinates(location, "groupBasedAt")?;
        return Ok((lon, lat, Some("groupBasedAt")));
    }

    Ok((0.0, 0.0, None))
}

/// Treats null and empty-object location values as documented absence.
fn present_object(value: Option<&Value>) -> Option<&Map<String, Value>> {
    value.and_then(Value::as_object).filter(|object| !object.is_empty())
}

fn read_ordinates(
    location: &Map<String, Value>,
    context: &str,
) -> Result<(f64, f64), AdapterError> {
    let lat = location
        .get("lat")
        .and_then(Value::as_f64)
        .ok_or_else(|| AdapterError::Parse(format!("{} is missing a numeric 'lat'", context)))?;
    let lon = location
        .get("long")
        .and_then(Value::as_f64)
        .ok_or_else(|| AdapterError::Parse(format!("{} is missing a numeric 'long'", context)))?;
    Ok((lon, lat))
}

/// Datetime extraction, in priority order: a `datetime` field in
/// offset format, then `lastModifiedDate` in Zulu format, then `None`.
///
/// Returns (parsed instant, whether the `datetime` field was the source).
fn extract_datetime(
    object: &Map<String, Value>,
) -> Result<(Option<DateTime<Utc>>, bool), AdapterError> {
    if let Some(Value::String(raw)) = object.get("datetime") {
        let parsed = parse_utc(raw, FMT_DATETIME_OFFSET, "datetime")?;
        return Ok((Some(parsed), true));
    }

    if let Some(Value::String(raw)) = object.get("lastModifiedDate") {
        let parsed = parse_utc(raw, FMT_DATETIME_ZULU, "lastModifiedDate")?;
        return Ok((Some(parsed), false));
    }

    Ok((None, false))
}

fn parse_utc(raw: &str, pattern: &str, field: &str) -> Result<DateTime<Utc>, AdapterError> {
    NaiveDateTime::parse_from_str(raw, pattern)
        .map(|dt| DateTime::from_naive_utc_and_offset(dt, Utc))
        .map_err(|e| {
            AdapterError::Parse(format!("unexpected {} format '{}': {}", field, raw, e))
        })
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
