//! UK railway station dataset client.

use std::sync::Arc;

use axum::http::{HeaderValue, header};
use serde::Deserialize;
use serde_json::Value;
use url::Url;

use crate::domain::{Crs, StationRecord};
use crate::providers::Provider;
use crate::upstream::{Upstream, UpstreamError, UpstreamRequest};

/// Raw entry in the upstream dataset. Only the fields we need.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StationDto {
    pub crs_code: Option<String>,
    pub station_name: Option<String>,
    pub constituent_country: Option<String>,
    pub lat: Option<Value>,
    pub long: Option<Value>,
}

impl StationDto {
    /// Convert to a station record, dropping entries without a usable
    /// CRS code or name.
    pub fn into_record(self) -> Option<StationRecord> {
        let crs = Crs::parse(&self.crs_code?.trim().to_uppercase()).ok()?;
        let name = self.station_name.filter(|n| !n.is_empty())?;

        Some(StationRecord {
            crs,
            name,
            country: self.constituent_country.unwrap_or_default().to_lowercase(),
            lat: self.lat.as_ref().and_then(coordinate),
            lon: self.long.as_ref().and_then(coordinate),
        })
    }
}

/// Coordinates arrive as numbers, but numeric strings are accepted too.
fn coordinate(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

/// Normalise the upstream payload, in upstream order.
///
/// Anything other than an array yields an empty catalog; malformed entries
/// are skipped individually.
pub fn parse_catalog(raw: Value) -> Vec<StationRecord> {
    let Value::Array(entries) = raw else {
        return Vec::new();
    };

    entries
        .into_iter()
        .filter_map(|entry| StationDto::deserialize(entry).ok())
        .filter_map(StationDto::into_record)
        .collect()
}

/// Fetches the station dataset through an [`Upstream`].
#[derive(Clone)]
pub struct StationSource {
    upstream: Arc<dyn Upstream>,
    url: String,
    user_agent: HeaderValue,
}

impl StationSource {
    pub fn new(upstream: Arc<dyn Upstream>, url: impl Into<String>, user_agent: &str) -> Self {
        Self {
            upstream,
            url: url.into(),
            user_agent: HeaderValue::from_str(user_agent)
                .unwrap_or_else(|_| HeaderValue::from_static(crate::config::DEFAULT_USER_AGENT)),
        }
    }

    /// Fetch and normalise every station.
    pub async fn fetch_all(&self) -> Result<Vec<StationRecord>, UpstreamError> {
        let url = Url::parse(&self.url)?;
        let request = UpstreamRequest::get(Provider::StationCatalog, url)
            .with_header(header::USER_AGENT, self.user_agent.clone());

        let response = self.upstream.send(request).await?;
        if !response.status.is_success() {
            return Err(UpstreamError::Status {
                provider: Provider::StationCatalog,
                status: response.status.as_u16(),
            });
        }

        let raw: Value = response.json().await?;
        Ok(parse_catalog(raw))
    }
}
