//! Upstream client error types.

use std::sync::Arc;

use crate::providers::Provider;

/// Errors from talking to a third-party provider.
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    /// HTTP request failed (network error, timeout, etc.)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Transport failure reported without a `reqwest::Error`
    #[error("transport error: {0}")]
    Transport(String),

    /// Provider answered with a non-success status where a body was needed
    #[error("{provider} HTTP {status}")]
    Status { provider: Provider, status: u16 },

    /// Response body could not be read
    #[error("failed to read response body: {0}")]
    Body(String),

    /// Response body was not the JSON we expected
    #[error("JSON parse error: {message}")]
    Json { message: String },

    /// Upstream URL could not be built
    #[error("invalid upstream URL: {0}")]
    Url(#[from] url::ParseError),

    /// One failure handed to every caller that waited on the same request
    #[error(transparent)]
    Shared(Arc<UpstreamError>),
}
