//! Positional schema of a state vector.
//!
//! The polling API reports each aircraft as an index-addressed array. This is
//! the only place that knows which index means what.

use crate::types::{FieldPresence, FlightRecord, ShapeError};
use interfaces::ABSENT_TEXT;
use serde_json::Value;

pub const ICAO24: usize = 0;
pub const CALLSIGN: usize = 1;
pub const ORIGIN_COUNTRY: usize = 2;
pub const TIME_POSITION: usize = 3;
pub const LAST_CONTACT: usize = 4;
pub const LONGITUDE: usize = 5;
pub const LATITUDE: usize = 6;
pub const BARO_ALTITUDE: usize = 7;
pub const ON_GROUND: usize = 8;
pub const VELOCITY: usize = 9;

/// Vectors shorter than this are rejected outright.
pub const MIN_FIELDS: usize = 10;

/// Build a record from positional fields, substituting defaults for
/// anything the source left null.
pub fn decode_fields(fields: &[Value]) -> Result<FlightRecord, ShapeError> {
    if fields.len() < MIN_FIELDS {
        return Err(ShapeError::TooShort {
            len: fields.len(),
            min: MIN_FIELDS,
        });
    }

    let icao24 = text_field(fields, ICAO24)?.unwrap_or_else(|| ABSENT_TEXT.to_string());
    let callsign = text_field(fields, CALLSIGN)?
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .unwrap_or_else(|| ABSENT_TEXT.to_string());
    let origin_country =
        text_field(fields, ORIGIN_COUNTRY)?.unwrap_or_else(|| ABSENT_TEXT.to_string());

    let (longitude, has_longitude) = float_field(fields, LONGITUDE)?;
    let (latitude, has_latitude) = float_field(fields, LATITUDE)?;
    let (altitude, has_altitude) = float_field(fields, BARO_ALTITUDE)?;
    let (velocity, has_velocity) = float_field(fields, VELOCITY)?;

    Ok(FlightRecord {
        icao24,
        callsign,
        origin_country,
        timestamp: timestamp_field(&fields[TIME_POSITION]),
        longitude,
        latitude,
        altitude,
        velocity,
        presence: FieldPresence {
            longitude: has_longitude,
            latitude: has_latitude,
            altitude: has_altitude,
            velocity: has_velocity,
        },
    })
}

/// Decode an arbitrary JSON value that is expected to be a state vector.
pub fn decode_value(value: &Value) -> Result<FlightRecord, ShapeError> {
    match value {
        Value::Array(fields) => decode_fields(fields),
        _ => Err(ShapeError::InnerNotSequence),
    }
}

// Falsy scalars (null, false, zero, empty string) read as absent.
fn text_field(fields: &[Value], index: usize) -> Result<Option<String>, ShapeError> {
    match &fields[index] {
        Value::Null | Value::Bool(false) => Ok(None),
        Value::String(s) if s.is_empty() => Ok(None),
        Value::String(s) => Ok(Some(s.clone())),
        Value::Number(n) if n.as_f64() == Some(0.0) => Ok(None),
        Value::Number(n) => Ok(Some(n.to_string())),
        Value::Bool(true) => Ok(Some("true".to_string())),
        Value::Array(_) | Value::Object(_) => Err(ShapeError::InvalidField {
            index,
            reason: "expected a scalar".to_string(),
        }),
    }
}

fn float_field(fields: &[Value], index: usize) -> Result<(f64, bool), ShapeError> {
    let invalid = |reason: &str| ShapeError::InvalidField {
        index,
        reason: reason.to_string(),
    };

    match &fields[index] {
        Value::Null => Ok((0.0, false)),
        Value::Number(n) => n
            .as_f64()
            .map(|v| (v, true))
            .ok_or_else(|| invalid("number out of range")),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map(|v| (v, true))
            .map_err(|_| invalid("not a number")),
        _ => Err(invalid("not a number")),
    }
}

/// Timestamps never reject a vector; anything unusable becomes 0.
fn timestamp_field(value: &Value) -> i64 {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64))
            .unwrap_or(0),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| {
                    s.parse::<f64>()
                        .ok()
                        .filter(|f| f.is_finite())
                        .map(|f| f.trunc() as i64)
                })
                .unwrap_or(0)
        }
        _ => 0,
    }
}
