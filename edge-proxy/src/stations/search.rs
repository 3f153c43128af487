//! Station search over a catalog snapshot.

use std::cmp::Ordering;

use serde::Serialize;

use crate::domain::{Crs, StationRecord};
use crate::geo::{compare_names, haversine_km, match_score, round_2dp};

/// Results returned when no limit is given.
pub const DEFAULT_LIMIT: usize = 20;

/// Largest accepted limit.
pub const MAX_LIMIT: usize = 100;

/// Neighbours further than this from the base station are left out.
pub const NEARBY_RADIUS_KM: f64 = 45.0;

/// A parsed station search.
#[derive(Debug, Clone, PartialEq)]
pub struct StationQuery {
    /// Trimmed, lowercased free text. `None` when blank.
    pub text: Option<String>,
    /// Base station for a radius search.
    pub crs: Option<Crs>,
    pub limit: usize,
}

impl StationQuery {
    /// Build a query from raw request parameters.
    pub fn from_params(q: Option<&str>, crs: Option<&str>, limit: Option<&str>) -> Self {
        Self {
            text: q
                .map(|q| q.trim().to_lowercase())
                .filter(|q| !q.is_empty()),
            crs: crs.and_then(Crs::from_input),
            limit: parse_limit(limit),
        }
    }
}

/// Parse a result limit: floored, clamped to `1..=100`, 20 when absent or
/// not a number.
pub fn parse_limit(raw: Option<&str>) -> usize {
    let Some(n) = raw
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|n| !n.is_nan())
    else {
        return DEFAULT_LIMIT;
    };

    // `as` saturates, so infinities and huge values land on the bounds
    (n.floor().clamp(1.0, MAX_LIMIT as f64)) as usize
}

/// A neighbouring station with its distance from the base.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NearbyStation {
    #[serde(flatten)]
    pub station: StationRecord,
    #[serde(rename = "distanceKm")]
    pub distance_km: f64,
}

/// Outcome of a search.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchResult {
    /// A radius search around `base`, nearest first. `base` is `None` when
    /// the code isn't in the catalog.
    Nearby {
        base: Option<StationRecord>,
        stations: Vec<NearbyStation>,
    },
    /// Text matches (best first) or a plain listing in catalog order.
    Matches(Vec<StationRecord>),
}

/// Run a query against a catalog.
pub fn search(stations: &[StationRecord], query: &StationQuery) -> SearchResult {
    if let Some(crs) = query.crs {
        return nearby(stations, crs, query.limit);
    }

    match &query.text {
        Some(text) => SearchResult::Matches(ranked(stations, text, query.limit)),
        None => SearchResult::Matches(stations.iter().take(query.limit).cloned().collect()),
    }
}

fn nearby(stations: &[StationRecord], crs: Crs, limit: usize) -> SearchResult {
    let Some(base) = stations.iter().find(|s| s.crs == crs) else {
        return SearchResult::Nearby {
            base: None,
            stations: Vec::new(),
        };
    };

    let Some(origin) = base.coordinates() else {
        return SearchResult::Nearby {
            base: Some(base.clone()),
            stations: Vec::new(),
        };
    };

    let mut neighbours: Vec<NearbyStation> = stations
        .iter()
        .filter(|s| s.crs != crs)
        .filter_map(|s| {
            let distance = haversine_km(origin, s.coordinates()?);
            (distance <= NEARBY_RADIUS_KM).then(|| NearbyStation {
                station: s.clone(),
                distance_km: round_2dp(distance),
            })
        })
        .collect();

    // Stable sort keeps catalog order between equal distances
    neighbours.sort_by(|a, b| {
        a.distance_km
            .partial_cmp(&b.distance_km)
            .unwrap_or(Ordering::Equal)
    });
    neighbours.truncate(limit);

    SearchResult::Nearby {
        base: Some(base.clone()),
        stations: neighbours,
    }
}

fn ranked(stations: &[StationRecord], text: &str, limit: usize) -> Vec<StationRecord> {
    let mut scored: Vec<(u32, &StationRecord)> = stations
        .iter()
        .map(|s| (match_score(s, text), s))
        .filter(|(score, _)| *score > 0)
        .collect();

    scored.sort_by(|(score_a, a), (score_b, b)| {
        score_b
            .cmp(score_a)
            .then_with(|| compare_names(&a.name, &b.name))
    });

    scored
        .into_iter()
        .take(limit)
        .map(|(_, s)| s.clone())
        .collect()
}
