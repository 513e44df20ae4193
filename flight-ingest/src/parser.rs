use crate::state_vector;
use crate::types::{FlightRecord, ShapeError};
use serde_json::Value;
use tracing::{debug, warn};

/// Field of the outer envelope holding the JSON-encoded state vector.
pub const ENVELOPE_FIELD: &str = "json_str";

/// Decode one stored line: `{"json_str": "[...]"}`.
pub fn parse_envelope_line(line: &str) -> Result<FlightRecord, ShapeError> {
    let outer: Value =
        serde_json::from_str(line).map_err(|e| ShapeError::InvalidJson(e.to_string()))?;

    let inner = match outer.get(ENVELOPE_FIELD) {
        Some(Value::String(inner)) => inner,
        Some(_) => return Err(ShapeError::JsonStrNotString),
        None => return Err(ShapeError::MissingJsonStr),
    };

    let inner: Value =
        serde_json::from_str(inner).map_err(|e| ShapeError::InvalidJson(e.to_string()))?;
    state_vector::decode_value(&inner)
}

/// Totals from parsing the lines of one stored object.
#[derive(Debug, Default)]
pub struct ParsedObject {
    pub records: Vec<FlightRecord>,
    pub lines_read: usize,
    pub lines_skipped: usize,
}

/// Parse at most `max_rows` lines of `content`. Blank lines count toward
/// the cap but produce nothing; malformed lines are skipped.
pub fn parse_object_lines(name: &str, content: &str, max_rows: usize) -> ParsedObject {
    let mut parsed = ParsedObject::default();

    for (line_num, line) in content.trim().lines().take(max_rows).enumerate() {
        let line_num = line_num + 1;
        parsed.lines_read += 1;

        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match parse_envelope_line(line) {
            Ok(record) => {
                if line_num <= 3 {
                    debug!(
                        "{} line {}: {} ({})",
                        name, line_num, record.callsign, record.origin_country
                    );
                }
                parsed.records.push(record);
            }
            Err(e) => {
                warn!("{} line {} skipped: {}", name, line_num, e);
                parsed.lines_skipped += 1;
            }
        }
    }

    parsed
}
