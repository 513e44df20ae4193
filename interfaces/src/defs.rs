use serde::{Deserialize, Serialize};

/// Marker used for text fields the source left empty.
pub const ABSENT_TEXT: &str = "-";

/// Which numeric fields of a [`FlightRecord`] were actually reported.
///
/// A missing value is stored as `0.0`, so the flags are the only way to
/// tell "not reported" apart from a legitimate zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldPresence {
    pub longitude: bool,
    pub latitude: bool,
    pub altitude: bool,
    pub velocity: bool,
}

impl FieldPresence {
    pub fn all() -> Self {
        Self {
            longitude: true,
            latitude: true,
            altitude: true,
            velocity: true,
        }
    }
}

/// A fully populated, analysis-ready flight observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlightRecord {
    pub icao24: String,
    pub callsign: String,
    pub origin_country: String,
    pub timestamp: i64,
    pub longitude: f64,
    pub latitude: f64,
    pub altitude: f64,
    pub velocity: f64,
    #[serde(default)]
    pub presence: FieldPresence,
}

impl FlightRecord {
    pub fn has_velocity_and_altitude(&self) -> bool {
        self.presence.velocity && self.presence.altitude
    }

    pub fn has_country(&self) -> bool {
        !self.origin_country.is_empty() && self.origin_country != ABSENT_TEXT
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlightStats {
    pub total: usize,
    pub valid: usize,
    pub mean_velocity: f64,
    pub min_velocity: f64,
    pub max_velocity: f64,
    pub mean_altitude: f64,
    pub min_altitude: f64,
    pub max_altitude: f64,
    pub distinct_countries: usize,
    pub top_country: Option<String>,
}

/// Result of summarizing a set of records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FlightSummary {
    Stats(FlightStats),
    /// No record carried both velocity and altitude.
    InsufficientData { total: usize },
}

// Object style note:
// A data source is queried by short lived consumers (prompt builders,
// request handlers). Each call must be independent of every other call,
// so implementations keep no per-call state between invocations.

pub trait FlightDataSource {
    fn load(&self, max_files: usize, max_rows: usize) -> impl Future<Output = Vec<FlightRecord>> + Send;
}
