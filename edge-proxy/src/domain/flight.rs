//! Canonical flight schedule shape.
//!
//! Aviationstack records are large and loosely populated. Consumers get a
//! fixed shape where every key is present and missing values are `null`
//! (or an empty string for display names).

use std::cmp::Reverse;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// One end of a flight.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegInfo {
    pub airport: String,
    pub scheduled: Option<String>,
    pub estimated: Option<String>,
    pub actual: Option<String>,
    /// Delay in minutes.
    pub delay: Option<i64>,
}

/// The canonical schedule returned by `/flight/schedule`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlightSchedule {
    pub flight_code: String,
    pub status: String,
    pub airline: String,
    pub departure: LegInfo,
    pub arrival: LegInfo,
}

/// Pull flight records out of an Aviationstack `/flights` body.
///
/// A missing or non-array `data` yields no records, and entries that
/// don't look like flights are skipped rather than failing the lookup.
pub fn parse_flights(raw: Value) -> Vec<FlightRecord> {
    let Value::Object(mut body) = raw else {
        return Vec::new();
    };
    let Some(Value::Array(entries)) = body.remove("data") else {
        return Vec::new();
    };

    entries
        .into_iter()
        .filter_map(|entry| FlightRecord::deserialize(entry).ok())
        .collect()
}

/// Choose the record to report.
///
/// Without a callsign only records flown by `icao24` are candidates.
/// Candidates are ranked by [`FlightRecord::match_score`]; ties keep
/// upstream order.
pub fn best_match(
    records: Vec<FlightRecord>,
    callsign: &str,
    icao24: &str,
) -> Option<FlightRecord> {
    records
        .into_iter()
        .filter(|record| !callsign.is_empty() || record.has_icao24(icao24))
        .min_by_key(|record| Reverse(record.match_score(callsign)))
}

/// A single Aviationstack flight record (only the fields we read).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FlightRecord {
    pub flight_status: Option<String>,
    pub departure: Option<LegRecord>,
    pub arrival: Option<LegRecord>,
    pub airline: Option<NamedRecord>,
    pub flight: Option<CodeRecord>,
    pub aircraft: Option<AircraftRecord>,
    /// Live position block; only its presence is read.
    pub live: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LegRecord {
    pub airport: Option<String>,
    pub iata: Option<String>,
    pub icao: Option<String>,
    pub scheduled: Option<String>,
    pub estimated: Option<String>,
    pub actual: Option<String>,
    #[serde(deserialize_with = "lenient_minutes")]
    pub delay: Option<i64>,
}

/// Minutes as a number or a numeric string; anything else is `None`.
fn lenient_minutes<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let minutes = match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.round() as i64)),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|f| f.is_finite())
            .map(|f| f.round() as i64),
        _ => None,
    };
    Ok(minutes)
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NamedRecord {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CodeRecord {
    pub iata: Option<String>,
    pub icao: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AircraftRecord {
    pub icao24: Option<String>,
}

/// Treat empty strings the same as missing values.
fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

impl FlightRecord {
    /// Whether this record was flown by the given transponder.
    pub fn has_icao24(&self, icao24: &str) -> bool {
        self.aircraft
            .as_ref()
            .and_then(|a| present(&a.icao24))
            .is_some_and(|hex| hex.eq_ignore_ascii_case(icao24))
    }

    /// How well this record answers a lookup for `callsign`: 50 for an
    /// exact IATA flight number, 20 for live tracking data, 10 for any
    /// reported status.
    pub fn match_score(&self, callsign: &str) -> u32 {
        let mut score = 0;
        let exact = self
            .flight
            .as_ref()
            .and_then(|f| f.iata.as_deref())
            .is_some_and(|iata| !callsign.is_empty() && iata.eq_ignore_ascii_case(callsign));
        if exact {
            score += 50;
        }
        if self.live.as_ref().is_some_and(truthy) {
            score += 20;
        }
        if present(&self.flight_status).is_some() {
            score += 10;
        }
        score
    }

    /// Map into the canonical shape. `callsign` is the fallback flight code.
    pub fn to_schedule(&self, callsign: &str) -> FlightSchedule {
        let flight_code = self
            .flight
            .as_ref()
            .and_then(|f| present(&f.iata).or(present(&f.icao)))
            .unwrap_or(callsign)
            .to_string();

        FlightSchedule {
            flight_code,
            status: present(&self.flight_status)
                .unwrap_or("unknown")
                .to_string(),
            airline: self
                .airline
                .as_ref()
                .and_then(|a| present(&a.name))
                .unwrap_or_default()
                .to_string(),
            departure: LegInfo::from_record(self.departure.as_ref()),
            arrival: LegInfo::from_record(self.arrival.as_ref()),
        }
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

impl LegInfo {
    fn from_record(record: Option<&LegRecord>) -> Self {
        let Some(leg) = record else {
            return LegInfo {
                airport: String::new(),
                scheduled: None,
                estimated: None,
                actual: None,
                delay: None,
            };
        };

        LegInfo {
            airport: present(&leg.airport)
                .or(present(&leg.iata))
                .or(present(&leg.icao))
                .unwrap_or_default()
                .to_string(),
            scheduled: present(&leg.scheduled).map(str::to_string),
            estimated: present(&leg.estimated).map(str::to_string),
            actual: present(&leg.actual).map(str::to_string),
            delay: leg.delay,
        }
    }
}
