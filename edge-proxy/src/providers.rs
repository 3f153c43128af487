//! Provider registry.
//!
//! Maps logical path prefixes to upstream providers, their auth
//! requirements and the handler that serves them. The table is evaluated
//! top to bottom and the first rule whose prefix and method both match
//! wins, so more specific prefixes must appear before more general ones.

use std::fmt;

use axum::http::Method;

use crate::config::CredentialKey;

/// An upstream data provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provider {
    CompaniesHouse,
    Tfl,
    Postcodes,
    OpenSky,
    OsPlaces,
    Webtris,
    Signalbox,
    NationalRail,
    StationCatalog,
    Nominatim,
    Aviationstack,
    Dvla,
}

impl Provider {
    pub const ALL: [Provider; 12] = [
        Provider::CompaniesHouse,
        Provider::Tfl,
        Provider::Postcodes,
        Provider::OpenSky,
        Provider::OsPlaces,
        Provider::Webtris,
        Provider::Signalbox,
        Provider::NationalRail,
        Provider::StationCatalog,
        Provider::Nominatim,
        Provider::Aviationstack,
        Provider::Dvla,
    ];

    /// Base URL that rewritten paths are appended to.
    pub fn base_url(self) -> &'static str {
        match self {
            Provider::CompaniesHouse => "https://api.company-information.service.gov.uk",
            Provider::Tfl => "https://api.tfl.gov.uk",
            Provider::Postcodes => "https://api.postcodes.io",
            Provider::OpenSky => "https://opensky-network.org/api",
            Provider::OsPlaces => "https://api.os.uk/search/places/v1",
            Provider::Webtris => "https://webtris.highwaysengland.co.uk/api",
            Provider::Signalbox => "https://api.signalbox.io/v2.5",
            // Darwin isn't wired up; the station catalog stands in for it
            Provider::NationalRail => "",
            Provider::StationCatalog => {
                "https://raw.githubusercontent.com/davwheat/uk-railway-stations/main/stations.json"
            }
            Provider::Nominatim => "https://nominatim.openstreetmap.org/search",
            Provider::Aviationstack => "http://api.aviationstack.com/v1",
            Provider::Dvla => "https://driver-vehicle-licensing.api.gov.uk",
        }
    }

    /// Endpoint advertised by health routes.
    pub fn health_endpoint(self) -> String {
        match self {
            Provider::Dvla => format!("{}{}", self.base_url(), DVLA_VEHICLES_PATH),
            Provider::NationalRail => "NRE Darwin not configured in worker".to_string(),
            _ => self.base_url().to_string(),
        }
    }

    /// Credential the provider needs, if any.
    pub fn credential(self) -> Option<CredentialKey> {
        match self {
            Provider::CompaniesHouse => Some(CredentialKey::CompaniesHouse),
            Provider::OsPlaces => Some(CredentialKey::OsPlaces),
            Provider::Signalbox => Some(CredentialKey::Signalbox),
            Provider::Aviationstack => Some(CredentialKey::Aviationstack),
            Provider::Dvla => Some(CredentialKey::Dvla),
            _ => None,
        }
    }

    /// Short name used in logs and error messages.
    pub fn name(self) -> &'static str {
        match self {
            Provider::CompaniesHouse => "companies house",
            Provider::Tfl => "tfl",
            Provider::Postcodes => "postcodes.io",
            Provider::OpenSky => "opensky",
            Provider::OsPlaces => "os places",
            Provider::Webtris => "webtris",
            Provider::Signalbox => "signalbox",
            Provider::NationalRail => "nre",
            Provider::StationCatalog => "stations catalog",
            Provider::Nominatim => "nominatim",
            Provider::Aviationstack => "aviationstack",
            Provider::Dvla => "dvla",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// DVLA vehicle enquiry path, relative to the DVLA base URL.
pub const DVLA_VEHICLES_PATH: &str = "/vehicle-enquiry/v1/vehicles";

/// How a route authenticates to its upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    None,
    /// `Authorization: Basic base64("<key>:")`.
    BasicFromEnv(CredentialKey),
    /// `Authorization: Bearer <key>`.
    BearerFromEnv(CredentialKey),
    /// The key as a query parameter.
    ApiKeyQueryParam {
        key: CredentialKey,
        param: &'static str,
    },
    /// The key in a custom header.
    ApiKeyHeader {
        key: CredentialKey,
        header: &'static str,
    },
}

/// How an inbound path maps onto the upstream path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathRewrite {
    /// Strip the prefix; use `fallback` if nothing remains.
    StripPrefix {
        prefix: &'static str,
        fallback: &'static str,
    },
    /// Ignore the inbound path and use a fixed one.
    Fixed(&'static str),
}

impl PathRewrite {
    const fn strip(prefix: &'static str) -> Self {
        PathRewrite::StripPrefix {
            prefix,
            fallback: "",
        }
    }

    /// Compute the upstream path for an inbound path.
    pub fn apply(&self, path: &str) -> String {
        match self {
            PathRewrite::StripPrefix { prefix, fallback } => {
                let rest = path.strip_prefix(*prefix).unwrap_or(path);
                if rest.is_empty() {
                    fallback.to_string()
                } else {
                    rest.to_string()
                }
            }
            PathRewrite::Fixed(fixed) => fixed.to_string(),
        }
    }
}

/// The handler a rule dispatches to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteKind {
    /// Forward to the provider, augmenting only auth headers.
    Passthrough(PathRewrite),
    /// `{ok, configured, endpoint}` without calling upstream.
    ProviderHealth,
    /// Summary of every provider's configuration.
    ProxyHealth,
    StationSearch,
    OsPlacesPostcode,
    GeoSearch,
    FlightSchedule,
    VehicleEnquiry,
}

/// One entry in the route table.
#[derive(Debug)]
pub struct RouteRule {
    pub prefix: &'static str,
    pub methods: &'static [Method],
    pub provider: Option<Provider>,
    pub auth: AuthMode,
    pub kind: RouteKind,
}

impl RouteRule {
    fn matches_path(&self, path: &str) -> bool {
        path.starts_with(self.prefix)
    }

    fn allows(&self, method: &Method) -> bool {
        self.methods.contains(method)
    }
}

const GET: &[Method] = &[Method::GET];
const POST: &[Method] = &[Method::POST];

const fn get(prefix: &'static str, provider: Provider, auth: AuthMode, kind: RouteKind) -> RouteRule {
    RouteRule {
        prefix,
        methods: GET,
        provider: Some(provider),
        auth,
        kind,
    }
}

/// The route table, most specific prefixes first.
pub static ROUTES: &[RouteRule] = &[
    get("/dvla/health", Provider::Dvla, AuthMode::None, RouteKind::ProviderHealth),
    RouteRule {
        prefix: "/dvla/vehicle",
        methods: POST,
        provider: Some(Provider::Dvla),
        auth: AuthMode::ApiKeyHeader {
            key: CredentialKey::Dvla,
            header: "x-api-key",
        },
        kind: RouteKind::VehicleEnquiry,
    },
    get(
        "/ch/",
        Provider::CompaniesHouse,
        AuthMode::BasicFromEnv(CredentialKey::CompaniesHouse),
        RouteKind::Passthrough(PathRewrite::strip("/ch")),
    ),
    get(
        "/tfl/",
        Provider::Tfl,
        AuthMode::None,
        RouteKind::Passthrough(PathRewrite::strip("/tfl")),
    ),
    get(
        "/postcodes/",
        Provider::Postcodes,
        AuthMode::None,
        RouteKind::Passthrough(PathRewrite::strip("/postcodes")),
    ),
    get(
        "/opensky/states/all",
        Provider::OpenSky,
        AuthMode::None,
        RouteKind::Passthrough(PathRewrite::Fixed("/states/all")),
    ),
    get(
        "/osplaces/postcode",
        Provider::OsPlaces,
        AuthMode::ApiKeyQueryParam {
            key: CredentialKey::OsPlaces,
            param: "key",
        },
        RouteKind::OsPlacesPostcode,
    ),
    get(
        "/webtris/",
        Provider::Webtris,
        AuthMode::None,
        RouteKind::Passthrough(PathRewrite::strip("/webtris")),
    ),
    get("/signalbox/health", Provider::Signalbox, AuthMode::None, RouteKind::ProviderHealth),
    get(
        "/signalbox/",
        Provider::Signalbox,
        AuthMode::BearerFromEnv(CredentialKey::Signalbox),
        RouteKind::Passthrough(PathRewrite::StripPrefix {
            prefix: "/signalbox",
            fallback: "/trains",
        }),
    ),
    get("/nre/health", Provider::NationalRail, AuthMode::None, RouteKind::ProviderHealth),
    get("/nre/stations", Provider::StationCatalog, AuthMode::None, RouteKind::StationSearch),
    get("/geo/search", Provider::Nominatim, AuthMode::None, RouteKind::GeoSearch),
    get(
        "/flight/schedule",
        Provider::Aviationstack,
        AuthMode::ApiKeyQueryParam {
            key: CredentialKey::Aviationstack,
            param: "access_key",
        },
        RouteKind::FlightSchedule,
    ),
    RouteRule {
        prefix: "/health",
        methods: GET,
        provider: None,
        auth: AuthMode::None,
        kind: RouteKind::ProxyHealth,
    },
];

/// Result of looking a request up in the route table.
#[derive(Debug)]
pub enum RouteMatch {
    Found(&'static RouteRule),
    MethodNotAllowed,
    NotFound,
}

/// Find the rule for a method and path.
///
/// Anything that isn't `GET` and matches no rule is a 405, even when the
/// path is unknown; an unmatched `GET` is a 404.
pub fn match_route(method: &Method, path: &str) -> RouteMatch {
    match ROUTES
        .iter()
        .find(|rule| rule.allows(method) && rule.matches_path(path))
    {
        Some(rule) => RouteMatch::Found(rule),
        None if *method != Method::GET => RouteMatch::MethodNotAllowed,
        None => RouteMatch::NotFound,
    }
}
