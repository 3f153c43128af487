//! Geographic and text-matching helpers.
//!
//! Pure functions used by the station catalog: great-circle distance and
//! the scoring used to rank stations against a free-text query.

use std::cmp::Ordering;

use crate::domain::StationRecord;

/// Mean Earth radius used for great-circle distances.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance in kilometres between two `(lat, lon)` points
/// given in degrees, using the haversine formula.
pub fn haversine_km(from: (f64, f64), to: (f64, f64)) -> f64 {
    let (lat1, lon1) = from;
    let (lat2, lon2) = to;

    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);

    2.0 * EARTH_RADIUS_KM * a.sqrt().min(1.0).asin()
}

/// Round to two decimal places.
pub fn round_2dp(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Score how well a station matches a query.
///
/// `query` must already be trimmed and lowercased. The axes are additive:
/// an exact CRS match scores 200 (otherwise a CRS prefix scores 120), a
/// name prefix adds 80 and a name substring adds 40. Zero means no match.
pub fn match_score(station: &StationRecord, query: &str) -> u32 {
    let query_upper = query.to_uppercase();
    let crs = station.crs.as_str();
    let name = station.name.to_lowercase();

    let mut score = 0;
    if crs == query_upper {
        score += 200;
    } else if crs.starts_with(&query_upper) {
        score += 120;
    }
    if name.starts_with(query) {
        score += 80;
    }
    if name.contains(query) {
        score += 40;
    }
    score
}

/// Order station names for display: case-insensitively first, with the
/// raw text as a tie-break so the order is total.
pub fn compare_names(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Crs;

    fn station(crs: &str, name: &str) -> StationRecord {
        StationRecord {
            crs: Crs::parse(crs).unwrap(),
            name: name.to_string(),
            country: "england".to_string(),
            lat: None,
            lon: None,
        }
    }

    const KINGS_CROSS: (f64, f64) = (51.5320, -0.1233);
    const MANCHESTER: (f64, f64) = (53.4774, -2.2309);

    #[test]
    fn london_to_manchester() {
        let d = haversine_km(KINGS_CROSS, MANCHESTER);
        // Roughly 259 km as the crow flies
        assert!((d - 259.0).abs() < 3.0, "got {d}");
    }

    #[test]
    fn antipodes_are_half_circumference() {
        let d = haversine_km((0.0, 0.0), (0.0, 180.0));
        assert!((d - std::f64::consts::PI * EARTH_RADIUS_KM).abs() < 1e-6);
    }

    #[test]
    fn rounding() {
        assert_eq!(round_2dp(0.264_9), 0.26);
        assert_eq!(round_2dp(0.265_1), 0.27);
        assert_eq!(round_2dp(12.0), 12.0);
    }

    #[test]
    fn exact_crs_beats_prefix() {
        assert_eq!(match_score(&station("KGX", "Kings Cross"), "kgx"), 200);
        assert_eq!(match_score(&station("KGX", "Kings Cross"), "kg"), 120);
    }

    #[test]
    fn name_prefix_also_counts_as_substring() {
        assert_eq!(match_score(&station("KGX", "Kings Cross"), "kings"), 120);
        assert_eq!(match_score(&station("WKY", "West Kingsway"), "kings"), 40);
    }

    #[test]
    fn axes_combine() {
        // "pad" is an exact CRS match and a name prefix
        assert_eq!(match_score(&station("PAD", "Paddington"), "pad"), 320);
    }

    #[test]
    fn no_match_scores_zero() {
        assert_eq!(match_score(&station("EUS", "Euston"), "york"), 0);
    }

    #[test]
    fn names_compare_case_insensitively() {
        assert_eq!(compare_names("abbey wood", "Acton"), Ordering::Less);
        assert_eq!(compare_names("Euston", "euston"), Ordering::Less);
        assert_eq!(compare_names("Euston", "Euston"), Ordering::Equal);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn point() -> impl Strategy<Value = (f64, f64)> {
        (-90.0f64..=90.0, -180.0f64..=180.0)
    }

    proptest! {
        #[test]
        fn distance_is_symmetric(a in point(), b in point()) {
            let ab = haversine_km(a, b);
            let ba = haversine_km(b, a);
            prop_assert!((ab - ba).abs() < 1e-9, "{ab} != {ba}");
        }

        #[test]
        fn distance_to_self_is_zero(a in point()) {
            prop_assert_eq!(haversine_km(a, a), 0.0);
        }

        #[test]
        fn distance_is_bounded(a in point(), b in point()) {
            let d = haversine_km(a, b);
            prop_assert!(d >= 0.0);
            prop_assert!(d <= std::f64::consts::PI * EARTH_RADIUS_KM + 1e-6);
        }
    }
}
