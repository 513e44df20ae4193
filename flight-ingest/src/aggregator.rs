use crate::types::{FlightRecord, FlightStats, FlightSummary};
use std::collections::HashMap;
use tracing::debug;

/// Summary statistics over loaded records.
pub struct RecordAggregator;

impl RecordAggregator {
    /// Statistics over records that report both velocity and altitude.
    /// Countries are counted over those same records; ties for the most
    /// common country go to the one seen first.
    pub fn summarize(records: &[FlightRecord]) -> FlightSummary {
        let valid: Vec<&FlightRecord> = records
            .iter()
            .filter(|r| r.has_velocity_and_altitude())
            .collect();

        if valid.is_empty() {
            debug!("No usable records among {}", records.len());
            return FlightSummary::InsufficientData {
                total: records.len(),
            };
        }

        let (mean_velocity, min_velocity, max_velocity) = spread(valid.iter().map(|r| r.velocity));
        let (mean_altitude, min_altitude, max_altitude) = spread(valid.iter().map(|r| r.altitude));

        let mut counts: HashMap<&str, usize> = HashMap::new();
        let mut first_seen: Vec<&str> = Vec::new();
        for record in valid.iter().filter(|r| r.has_country()) {
            let count = counts.entry(record.origin_country.as_str()).or_insert(0);
            if *count == 0 {
                first_seen.push(record.origin_country.as_str());
            }
            *count += 1;
        }

        let mut top_country: Option<(&str, usize)> = None;
        for &country in &first_seen {
            let count = counts[country];
            if top_country.map_or(true, |(_, best)| count > best) {
                top_country = Some((country, count));
            }
        }

        FlightSummary::Stats(FlightStats {
            total: records.len(),
            valid: valid.len(),
            mean_velocity,
            min_velocity,
            max_velocity,
            mean_altitude,
            min_altitude,
            max_altitude,
            distinct_countries: first_seen.len(),
            top_country: top_country.map(|(country, _)| country.to_string()),
        })
    }
}

// Caller guarantees at least one value.
fn spread(values: impl Iterator<Item = f64>) -> (f64, f64, f64) {
    let mut count = 0usize;
    let mut sum = 0.0;
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for v in values {
        count += 1;
        sum += v;
        min = min.min(v);
        max = max.max(v);
    }
    (sum / count as f64, min, max)
}

/// A short explanation for callers that cannot present statistics.
pub fn describe(summary: &FlightSummary) -> String {
    match summary {
        FlightSummary::InsufficientData { total: 0 } => {
            "No flight data is available for analysis right now.".to_string()
        }
        FlightSummary::InsufficientData { total } => format!(
            "There are {} flight records, but none carries both velocity and altitude.",
            total
        ),
        FlightSummary::Stats(stats) => format!(
            "{} flights ({} usable): mean velocity {:.2} m/s (max {:.2}), mean altitude {:.2} m (max {:.2}), {} countries, most common {}",
            stats.total,
            stats.valid,
            stats.mean_velocity,
            stats.max_velocity,
            stats.mean_altitude,
            stats.max_altitude,
            stats.distinct_countries,
            stats.top_country.as_deref().unwrap_or("unknown")
        ),
    }
}
