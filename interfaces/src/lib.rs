pub mod defs;

pub use defs::{ABSENT_TEXT, FieldPresence, FlightDataSource, FlightRecord, FlightStats, FlightSummary};
