//! Proxy error type and its HTTP mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::auth::CredentialError;
use crate::domain::StationRecord;
use crate::upstream::UpstreamError;
use crate::web::json_response;

/// Everything a handler can fail with.
///
/// Each variant maps to exactly one status and body shape in
/// [`IntoResponse`], so handlers never build error responses themselves.
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    /// A required provider credential is absent
    #[error(transparent)]
    Configuration(#[from] CredentialError),

    /// Bad caller input
    #[error("{0}")]
    Validation(String),

    /// Talking to a provider failed
    #[error("upstream error: {0}")]
    Upstream(#[from] UpstreamError),

    /// The station dataset couldn't be fetched
    #[error("station catalog unavailable: {0}")]
    CatalogUnavailable(UpstreamError),

    /// Anything else unexpected, e.g. a handler panic
    #[error("{0}")]
    Unexpected(String),

    #[error("Not found")]
    NotFound,

    #[error("Method not allowed")]
    MethodNotAllowed,
}

impl ProxyError {
    pub fn validation(message: impl Into<String>) -> Self {
        ProxyError::Validation(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ProxyError::Validation(_) => StatusCode::BAD_REQUEST,
            ProxyError::Upstream(_)
            | ProxyError::CatalogUnavailable(_)
            | ProxyError::Unexpected(_) => StatusCode::BAD_GATEWAY,
            ProxyError::NotFound => StatusCode::NOT_FOUND,
            ProxyError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
        }
    }
}

/// The `{error, detail?}` body shared by every error response.
#[derive(Debug, Serialize)]
pub struct ErrorEnvelope {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ErrorEnvelope {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// Body for a catalog failure on the station search route. Keeps the
/// `stations` key so clients can read the list unconditionally.
#[derive(Debug, Serialize)]
struct CatalogFailure {
    ok: bool,
    error: &'static str,
    detail: String,
    stations: Vec<StationRecord>,
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            ProxyError::Configuration(e) => json_response(status, &ErrorEnvelope::new(e.to_string())),
            ProxyError::Validation(message) => json_response(status, &ErrorEnvelope::new(message)),
            ProxyError::Upstream(e) => json_response(
                status,
                &ErrorEnvelope::new("Proxy failure").with_detail(e.to_string()),
            ),
            ProxyError::Unexpected(message) => json_response(
                status,
                &ErrorEnvelope::new("Proxy failure").with_detail(message),
            ),
            ProxyError::CatalogUnavailable(e) => json_response(
                status,
                &CatalogFailure {
                    ok: false,
                    error: "station catalog unavailable",
                    detail: e.to_string(),
                    stations: Vec::new(),
                },
            ),
            ProxyError::NotFound => json_response(status, &ErrorEnvelope::new("Not found")),
            ProxyError::MethodNotAllowed => {
                json_response(status, &ErrorEnvelope::new("Method not allowed"))
            }
        }
    }
}
