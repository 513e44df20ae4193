use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

pub use interfaces::{FieldPresence, FlightRecord, FlightStats, FlightSummary};

/// One positional telemetry tuple, exactly as the polling API reports it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawStateVector(pub Vec<Value>);

impl RawStateVector {
    pub fn fields(&self) -> &[Value] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<Value>> for RawStateVector {
    fn from(fields: Vec<Value>) -> Self {
        Self(fields)
    }
}

/// One poll result from the external source.
///
/// Entries of `states` stay untyped until [`Snapshot::into_state_vectors`],
/// so one malformed entry cannot fail the whole response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub time: Option<i64>,
    #[serde(default)]
    pub states: Option<Vec<Value>>,
}

impl Snapshot {
    /// Entries worth sending, if any. A missing and an empty collection are
    /// the same thing to callers.
    pub fn states(&self) -> Option<&[Value]> {
        match &self.states {
            Some(states) if !states.is_empty() => Some(states),
            _ => None,
        }
    }

    /// Split the entries into state vectors and a count of entries that
    /// were not arrays. Returns `None` when there is nothing to send.
    pub fn into_state_vectors(self) -> Option<StateVectors> {
        let states = self.states.filter(|s| !s.is_empty())?;
        let mut vectors = Vec::with_capacity(states.len());
        let mut malformed = 0;
        for (index, state) in states.into_iter().enumerate() {
            match state {
                Value::Array(fields) => vectors.push(RawStateVector(fields)),
                other => {
                    warn!("State {} is not an array, skipping: {}", index, other);
                    malformed += 1;
                }
            }
        }
        Some(StateVectors { vectors, malformed })
    }
}

/// Usable state vectors from one snapshot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateVectors {
    pub vectors: Vec<RawStateVector>,
    /// Entries dropped because they were not arrays.
    pub malformed: usize,
}

#[derive(Debug, Clone)]
pub enum FetchOutcome {
    Snapshot(Snapshot),
    Failed(String),
}

impl FetchOutcome {
    pub fn into_states(self) -> Option<StateVectors> {
        match self {
            FetchOutcome::Snapshot(snapshot) => snapshot.into_state_vectors(),
            FetchOutcome::Failed(_) => None,
        }
    }
}

/// Totals for one `BatchSender::send_batch` call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendReport {
    pub records_submitted: usize,
    pub records_sent: usize,
    pub records_skipped: usize,
    pub batches_attempted: usize,
    pub batches_failed: usize,
}

impl SendReport {
    pub fn is_clean(&self) -> bool {
        self.records_skipped == 0 && self.batches_failed == 0
    }
}

/// Why a stored line or state vector could not become a [`FlightRecord`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ShapeError {
    #[error("line is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("envelope has no json_str field")]
    MissingJsonStr,

    #[error("json_str is not a string")]
    JsonStrNotString,

    #[error("json_str does not hold a JSON array")]
    InnerNotSequence,

    #[error("state vector has {len} fields, need at least {min}")]
    TooShort { len: usize, min: usize },

    #[error("field {index} is invalid: {reason}")]
    InvalidField { index: usize, reason: String },
}

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] object_store::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Polling source unavailable: {reason}")]
    TransientFetch { reason: String },

    #[error("Object {name} could not be read: {reason}")]
    ObjectAccess { name: String, reason: String },

    #[error("Storage backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Record of {size} bytes exceeds the {limit} byte batch limit")]
    OversizedRecord { size: usize, limit: usize },

    #[error("Sink rejected batch with HTTP {status}: {body}")]
    Sink { status: u16, body: String },

    #[error("General error: {0}")]
    General(String),
}

pub type Result<T> = std::result::Result<T, IngestError>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn non_array_states_are_dropped_individually() {
        let snapshot: Snapshot = serde_json::from_value(json!({
            "time": 1,
            "states": [["a", 1], null, {"icao24": "b"}, "c", ["d", 2]]
        }))
        .unwrap();

        let states = snapshot.into_state_vectors().unwrap();
        assert_eq!(
            states.vectors,
            vec![
                RawStateVector(vec![json!("a"), json!(1)]),
                RawStateVector(vec![json!("d"), json!(2)]),
            ]
        );
        assert_eq!(states.malformed, 3);
    }

    #[test]
    fn missing_or_empty_states_yield_nothing() {
        assert_eq!(Snapshot::default().into_state_vectors(), None);
        let empty = Snapshot {
            time: Some(1),
            states: Some(Vec::new()),
        };
        assert_eq!(empty.into_state_vectors(), None);
    }
}
