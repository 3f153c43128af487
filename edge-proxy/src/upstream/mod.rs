//! Outbound HTTP to third-party providers.
//!
//! Every upstream call goes through the [`Upstream`] trait. Production uses
//! [`HttpUpstream`], a thin wrapper over `reqwest`; tests use
//! `MockUpstream`, which serves scripted replies and records what it was
//! asked for.

mod client;
mod error;
#[cfg(test)]
mod mock;

use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, header};
use futures::future::BoxFuture;
use serde::de::DeserializeOwned;
use url::Url;

use crate::providers::Provider;

pub use client::HttpUpstream;
pub use error::UpstreamError;
#[cfg(test)]
pub use mock::{MockReply, MockUpstream, RecordedRequest};

/// Largest body we will buffer when a handler needs to parse a response.
const MAX_BUFFERED_BODY: usize = 64 * 1024 * 1024;

/// A request to a provider.
#[derive(Debug, Clone)]
pub struct UpstreamRequest {
    pub provider: Provider,
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
}

impl UpstreamRequest {
    /// A `GET` that accepts JSON.
    pub fn get(provider: Provider, url: Url) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        Self {
            provider,
            method: Method::GET,
            url,
            headers,
            body: None,
        }
    }

    /// A `POST` of a JSON body that accepts JSON.
    pub fn post_json(provider: Provider, url: Url, body: impl Into<Bytes>) -> Self {
        let mut request = Self::get(provider, url);
        request.method = Method::POST;
        request.headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        request.body = Some(body.into());
        request
    }

    /// Add a header, replacing any existing value.
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }
}

/// A provider's response with the body still unread.
#[derive(Debug)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Body,
}

impl UpstreamResponse {
    /// Buffer the whole body.
    pub async fn bytes(self) -> Result<Bytes, UpstreamError> {
        axum::body::to_bytes(self.body, MAX_BUFFERED_BODY)
            .await
            .map_err(|e| UpstreamError::Body(e.to_string()))
    }

    /// Buffer and parse the body as JSON.
    pub async fn json<T: DeserializeOwned>(self) -> Result<T, UpstreamError> {
        let body = self.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| UpstreamError::Json {
            message: e.to_string(),
        })
    }
}

/// Something that can perform upstream requests.
pub trait Upstream: Send + Sync + 'static {
    fn send(&self, request: UpstreamRequest)
    -> BoxFuture<'_, Result<UpstreamResponse, UpstreamError>>;
}
