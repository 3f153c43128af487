//! Domain types for the edge proxy.
//!
//! Values here are validated at construction time, so handlers that
//! receive them can trust their invariants.

mod flight;
mod station;

pub use flight::{FlightRecord, FlightSchedule, LegInfo, best_match, parse_flights};
pub use station::{Crs, InvalidCrs, StationRecord};
