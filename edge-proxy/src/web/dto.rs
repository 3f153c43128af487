//! Data transfer objects for locally built responses.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::{FlightSchedule, StationRecord};
use crate::stations::NearbyStation;

/// Introspection of a single provider.
#[derive(Debug, Serialize)]
pub struct ProviderHealth {
    pub ok: bool,
    pub configured: bool,
    pub endpoint: String,
}

/// `GET /health`.
#[derive(Debug, Serialize)]
pub struct ProxyHealth {
    pub ok: bool,

    /// Provider name → whether its credential is configured
    pub providers: BTreeMap<&'static str, bool>,

    #[serde(rename = "stationCatalog")]
    pub station_catalog: CatalogHealth,
}

/// State of the station catalog cache.
#[derive(Debug, Serialize)]
pub struct CatalogHealth {
    pub loaded: bool,
    pub stations: usize,
    #[serde(rename = "fetchedAt")]
    pub fetched_at: Option<DateTime<Utc>>,
}

/// Radius search around a base station.
#[derive(Debug, Serialize)]
pub struct NearbyStationsResponse {
    pub ok: bool,
    pub base: Option<StationRecord>,
    pub stations: Vec<NearbyStation>,
}

/// Text search or plain listing.
#[derive(Debug, Serialize)]
pub struct StationsResponse {
    pub ok: bool,
    pub stations: Vec<StationRecord>,
}

/// `GET /flight/schedule`.
///
/// `flight` is omitted (not `null`) when the upstream call failed.
#[derive(Debug, Serialize)]
pub struct FlightScheduleResponse {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flight: Option<Option<FlightSchedule>>,
}

impl FlightScheduleResponse {
    pub fn found(flight: FlightSchedule) -> Self {
        Self {
            ok: true,
            reason: None,
            detail: None,
            flight: Some(Some(flight)),
        }
    }

    /// The request was understood but there's nothing to show.
    pub fn empty(ok: bool, reason: impl Into<String>) -> Self {
        Self {
            ok,
            reason: Some(reason.into()),
            detail: None,
            flight: Some(None),
        }
    }

    pub fn upstream_failed(reason: impl Into<String>) -> Self {
        Self {
            ok: false,
            reason: Some(reason.into()),
            detail: None,
            flight: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// `POST /dvla/vehicle` request body.
///
/// The registration is kept loose so numbers are accepted as well as
/// strings.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VehicleEnquiryRequest {
    pub registration_number: Option<Value>,
}

impl VehicleEnquiryRequest {
    /// The registration, uppercased with everything but `A-Z0-9` removed.
    pub fn normalised_registration(&self) -> String {
        let raw = match &self.registration_number {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => String::new(),
        };

        raw.to_uppercase()
            .chars()
            .filter(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
            .collect()
    }
}

/// Body sent to DVLA.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleEnquiry<'a> {
    pub registration_number: &'a str,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn registration(body: Value) -> String {
        serde_json::from_value::<VehicleEnquiryRequest>(body)
            .unwrap()
            .normalised_registration()
    }

    #[test]
    fn registration_is_normalised() {
        assert_eq!(registration(json!({"registrationNumber": "ab12 cde"})), "AB12CDE");
        assert_eq!(registration(json!({"registrationNumber": " w-123/xyz "})), "W123XYZ");
        assert_eq!(registration(json!({"registrationNumber": 1234})), "1234");
        assert_eq!(registration(json!({"registrationNumber": true})), "");
        assert_eq!(registration(json!({})), "");
    }

    #[test]
    fn flight_response_shapes() {
        let json = serde_json::to_value(FlightScheduleResponse::empty(true, "no schedule match"))
            .unwrap();
        assert_eq!(
            json,
            json!({"ok": true, "reason": "no schedule match", "flight": null})
        );

        let json =
            serde_json::to_value(FlightScheduleResponse::upstream_failed("aviationstack HTTP 500"))
                .unwrap();
        assert_eq!(json, json!({"ok": false, "reason": "aviationstack HTTP 500"}));

        let json = serde_json::to_value(
            FlightScheduleResponse::upstream_failed("aviationstack request failed")
                .with_detail("timed out"),
        )
        .unwrap();
        assert_eq!(
            json,
            json!({"ok": false, "reason": "aviationstack request failed", "detail": "timed out"})
        );
    }

    #[test]
    fn outbound_vehicle_enquiry() {
        let json = serde_json::to_string(&VehicleEnquiry {
            registration_number: "AB12CDE",
        })
        .unwrap();
        assert_eq!(json, r#"{"registrationNumber":"AB12CDE"}"#);
    }
}
