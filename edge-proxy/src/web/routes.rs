//! Request dispatch and route handlers.
//!
//! Nothing is registered with axum's router directly: a single fallback
//! walks [`ROUTES`](crate::providers::ROUTES) so that matching order is
//! exactly the table order.

use std::any::Any;
use std::borrow::Cow;
use std::collections::BTreeMap;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{Method, StatusCode, Uri, header};
use axum::middleware;
use axum::response::{IntoResponse, Response};
use axum::Router;
use serde_json::Value;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, warn};
use url::Url;
use url::form_urlencoded;

use crate::domain::{best_match, parse_flights};
use crate::error::ProxyError;
use crate::providers::{
    AuthMode, DVLA_VEHICLES_PATH, PathRewrite, Provider, RouteKind, RouteMatch, RouteRule,
    match_route,
};
use crate::stations::{SearchResult, StationQuery, search};
use crate::upstream::{UpstreamError, UpstreamRequest};

use super::dto::*;
use super::normalize::{json_response, passthrough, preflight, with_cors};
use super::state::AppState;

/// Aviationstack records requested per lookup.
const FLIGHT_LOOKUP_LIMIT: &str = "12";

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .fallback(dispatch)
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::custom(panic_response))
        // Outermost, so every response gets CORS headers, panics included
        .layer(middleware::map_response(with_cors))
        .with_state(state)
}

/// Turn a handler panic into the usual 502 envelope.
fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else {
        "handler panicked".to_string()
    };

    error!(%detail, "handler panicked");
    ProxyError::Unexpected(detail).into_response()
}

async fn dispatch(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    body: Bytes,
) -> Response {
    if method == Method::OPTIONS {
        return preflight();
    }

    let path = uri.path();
    let result = match match_route(&method, path) {
        RouteMatch::Found(rule) => {
            debug!(%method, path, route = rule.prefix, "dispatching");
            handle(&state, rule, &uri, &body).await
        }
        RouteMatch::MethodNotAllowed => Err(ProxyError::MethodNotAllowed),
        RouteMatch::NotFound => Err(ProxyError::NotFound),
    };

    result.unwrap_or_else(|err| {
        let status = err.status();
        if status.is_server_error() {
            warn!(%method, path, status = status.as_u16(), error = %err, "request failed");
        } else {
            debug!(%method, path, status = status.as_u16(), error = %err, "request rejected");
        }
        err.into_response()
    })
}

async fn handle(
    state: &AppState,
    rule: &'static RouteRule,
    uri: &Uri,
    body: &Bytes,
) -> Result<Response, ProxyError> {
    let params = QueryParams::parse(uri.query());

    match rule.kind {
        RouteKind::Passthrough(rewrite) => proxy_passthrough(state, rule, rewrite, uri).await,
        RouteKind::ProviderHealth => provider_health(state, rule),
        RouteKind::ProxyHealth => Ok(proxy_health(state).await),
        RouteKind::StationSearch => station_search(state, &params).await,
        RouteKind::OsPlacesPostcode => osplaces_postcode(state, rule, &params).await,
        RouteKind::GeoSearch => geo_search(state, rule, &params).await,
        RouteKind::FlightSchedule => flight_schedule(state, rule, &params).await,
        RouteKind::VehicleEnquiry => vehicle_enquiry(state, rule, body).await,
    }
}

/// Query string parameters. Lookups return the first occurrence.
struct QueryParams<'a> {
    pairs: Vec<(Cow<'a, str>, Cow<'a, str>)>,
}

impl<'a> QueryParams<'a> {
    fn parse(query: Option<&'a str>) -> Self {
        Self {
            pairs: query
                .map(|q| form_urlencoded::parse(q.as_bytes()).collect())
                .unwrap_or_default(),
        }
    }

    fn get(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_ref())
    }

    /// The parameter trimmed, or `""` when absent.
    fn trimmed(&self, name: &str) -> &str {
        self.get(name).map(str::trim).unwrap_or_default()
    }
}

fn provider_of(rule: &RouteRule) -> Result<Provider, ProxyError> {
    rule.provider
        .ok_or_else(|| ProxyError::Unexpected(format!("route {} has no provider", rule.prefix)))
}

/// Attach credentials and relay the provider's response.
async fn forward(
    state: &AppState,
    auth: AuthMode,
    mut request: UpstreamRequest,
) -> Result<Response, ProxyError> {
    auth.apply(&state.credentials, &mut request)?;
    let response = state.upstream.send(request).await?;
    Ok(passthrough(response))
}

async fn proxy_passthrough(
    state: &AppState,
    rule: &RouteRule,
    rewrite: PathRewrite,
    uri: &Uri,
) -> Result<Response, ProxyError> {
    let provider = provider_of(rule)?;

    let mut target = format!("{}{}", provider.base_url(), rewrite.apply(uri.path()));
    if let Some(query) = uri.query() {
        target.push('?');
        target.push_str(query);
    }
    let url = Url::parse(&target).map_err(UpstreamError::from)?;

    forward(state, rule.auth, UpstreamRequest::get(provider, url)).await
}

fn provider_health(state: &AppState, rule: &RouteRule) -> Result<Response, ProxyError> {
    let provider = provider_of(rule)?;
    let configured = provider
        .credential()
        .is_some_and(|key| state.credentials.is_configured(key));

    Ok(json_response(
        StatusCode::OK,
        &ProviderHealth {
            ok: true,
            configured,
            endpoint: provider.health_endpoint(),
        },
    ))
}

async fn proxy_health(state: &AppState) -> Response {
    let providers: BTreeMap<_, _> = Provider::ALL
        .into_iter()
        .filter_map(|p| {
            p.credential()
                .map(|key| (p.name(), state.credentials.is_configured(key)))
        })
        .collect();

    let snapshot = state.catalog.snapshot().await;
    let station_catalog = CatalogHealth {
        loaded: snapshot.is_some(),
        stations: snapshot.as_ref().map_or(0, |s| s.stations.len()),
        fetched_at: snapshot.as_ref().map(|s| s.fetched_at),
    };

    json_response(
        StatusCode::OK,
        &ProxyHealth {
            ok: true,
            providers,
            station_catalog,
        },
    )
}

async fn station_search(state: &AppState, params: &QueryParams<'_>) -> Result<Response, ProxyError> {
    let query = StationQuery::from_params(params.get("q"), params.get("crs"), params.get("limit"));
    let snapshot = state
        .catalog
        .get()
        .await
        .map_err(ProxyError::CatalogUnavailable)?;

    let response = match search(&snapshot.stations, &query) {
        SearchResult::Nearby { base, stations } => json_response(
            StatusCode::OK,
            &NearbyStationsResponse {
                ok: true,
                base,
                stations,
            },
        ),
        SearchResult::Matches(stations) => json_response(
            StatusCode::OK,
            &StationsResponse { ok: true, stations },
        ),
    };
    Ok(response)
}

async fn osplaces_postcode(
    state: &AppState,
    rule: &RouteRule,
    params: &QueryParams<'_>,
) -> Result<Response, ProxyError> {
    let postcode = params.trimmed("postcode");
    if postcode.is_empty() {
        return Err(ProxyError::validation("postcode query parameter required"));
    }

    let provider = provider_of(rule)?;
    let url = Url::parse_with_params(
        &format!("{}/postcode", provider.base_url()),
        [
            ("postcode", postcode),
            ("maxresults", "1"),
            ("output_srs", "EPSG:4326"),
        ],
    )
    .map_err(UpstreamError::from)?;

    forward(state, rule.auth, UpstreamRequest::get(provider, url)).await
}

async fn geo_search(
    state: &AppState,
    rule: &RouteRule,
    params: &QueryParams<'_>,
) -> Result<Response, ProxyError> {
    let q = params.trimmed("q");
    if q.is_empty() {
        return Err(ProxyError::validation("q query parameter required"));
    }
    let limit = params.get("limit").filter(|l| !l.is_empty()).unwrap_or("1");

    let provider = provider_of(rule)?;
    let url = Url::parse_with_params(
        provider.base_url(),
        [("q", q), ("format", "jsonv2"), ("limit", limit)],
    )
    .map_err(UpstreamError::from)?;

    let request = UpstreamRequest::get(provider, url)
        .with_header(header::USER_AGENT, state.user_agent.clone());
    forward(state, rule.auth, request).await
}

/// Look up a flight and reduce it to the canonical schedule.
///
/// Configuration gaps and empty results are reported in the body with a
/// 200, since neither is a failure from the caller's point of view.
async fn flight_schedule(
    state: &AppState,
    rule: &RouteRule,
    params: &QueryParams<'_>,
) -> Result<Response, ProxyError> {
    let callsign = params.trimmed("callsign").to_uppercase();
    let icao24 = params.trimmed("icao24").to_lowercase();
    if callsign.is_empty() && icao24.is_empty() {
        return Ok(json_response(
            StatusCode::BAD_REQUEST,
            &FlightScheduleResponse::empty(false, "callsign or icao24 required"),
        ));
    }

    if let Err(missing) = rule.auth.require(&state.credentials) {
        debug!(error = %missing, "flight lookup skipped");
        return Ok(json_response(
            StatusCode::OK,
            &FlightScheduleResponse::empty(false, missing.to_string()),
        ));
    }

    let provider = provider_of(rule)?;
    let mut url = Url::parse(&format!("{}/flights", provider.base_url()))
        .map_err(UpstreamError::from)?;
    url.query_pairs_mut().append_pair("limit", FLIGHT_LOOKUP_LIMIT);
    if !callsign.is_empty() {
        url.query_pairs_mut().append_pair("flight_iata", &callsign);
    }

    let mut request = UpstreamRequest::get(provider, url);
    rule.auth.apply(&state.credentials, &mut request)?;
    let response = match state.upstream.send(request).await {
        Ok(response) => response,
        Err(e) => return Ok(flight_request_failed(&e)),
    };

    if !response.status.is_success() {
        let failure = UpstreamError::Status {
            provider,
            status: response.status.as_u16(),
        };
        warn!(error = %failure, "flight lookup failed");
        return Ok(json_response(
            StatusCode::BAD_GATEWAY,
            &FlightScheduleResponse::upstream_failed(failure.to_string()),
        ));
    }

    let raw: Value = match response.json().await {
        Ok(raw) => raw,
        Err(e) => return Ok(flight_request_failed(&e)),
    };

    let body = match best_match(parse_flights(raw), &callsign, &icao24) {
        Some(record) => FlightScheduleResponse::found(record.to_schedule(&callsign)),
        None => FlightScheduleResponse::empty(true, "no schedule match"),
    };
    Ok(json_response(StatusCode::OK, &body))
}

fn flight_request_failed(error: &UpstreamError) -> Response {
    warn!(error = %error, "flight lookup failed");
    json_response(
        StatusCode::BAD_GATEWAY,
        &FlightScheduleResponse::upstream_failed("aviationstack request failed")
            .with_detail(error.to_string()),
    )
}

async fn vehicle_enquiry(
    state: &AppState,
    rule: &RouteRule,
    body: &Bytes,
) -> Result<Response, ProxyError> {
    let json: Value =
        serde_json::from_slice(body).map_err(|_| ProxyError::validation("Invalid JSON body"))?;
    // Valid JSON of the wrong shape is treated like a missing field
    let registration = serde_json::from_value::<VehicleEnquiryRequest>(json)
        .unwrap_or_default()
        .normalised_registration();
    if registration.is_empty() {
        return Err(ProxyError::validation("registrationNumber is required"));
    }

    let provider = provider_of(rule)?;
    let url = Url::parse(&format!("{}{}", provider.base_url(), DVLA_VEHICLES_PATH))
        .map_err(UpstreamError::from)?;
    let payload = serde_json::to_vec(&VehicleEnquiry {
        registration_number: &registration,
    })
    .map_err(|e| ProxyError::Unexpected(e.to_string()))?;

    forward(state, rule.auth, UpstreamRequest::post_json(provider, url, payload)).await
}
