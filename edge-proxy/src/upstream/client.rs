//! `reqwest`-backed upstream client.

use std::time::Duration;

use axum::body::Body;
use futures::future::BoxFuture;
use futures::{FutureExt, TryStreamExt};
use tracing::debug;

use super::error::UpstreamError;
use super::{Upstream, UpstreamRequest, UpstreamResponse};

/// Upstream client used in production.
///
/// Holds no provider state: auth and headers arrive fully formed on each
/// request. Response bodies are streamed, not buffered. Errors are stripped
/// of the request URL before they leave this type.
#[derive(Debug, Clone)]
pub struct HttpUpstream {
    http: reqwest::Client,
}

impl HttpUpstream {
    /// Create a client. `timeout` of `None` leaves requests unbounded.
    pub fn new(timeout: Option<Duration>) -> Result<Self, UpstreamError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            http: builder.build()?,
        })
    }

    async fn execute(&self, request: UpstreamRequest) -> Result<UpstreamResponse, UpstreamError> {
        let UpstreamRequest {
            provider,
            method,
            url,
            headers,
            body,
        } = request;

        debug!(%provider, %method, host = url.host_str().unwrap_or_default(), "upstream request");

        let mut builder = self.http.request(method, url).headers(headers);
        if let Some(body) = body {
            builder = builder.body(body);
        }

        // Request URLs can carry API keys, so errors never keep them
        let response = builder.send().await.map_err(reqwest::Error::without_url)?;
        let status = response.status();
        let headers = response.headers().clone();

        debug!(%provider, status = status.as_u16(), "upstream responded");

        Ok(UpstreamResponse {
            status,
            headers,
            body: Body::from_stream(response.bytes_stream().map_err(reqwest::Error::without_url)),
        })
    }
}

impl Upstream for HttpUpstream {
    fn send(
        &self,
        request: UpstreamRequest,
    ) -> BoxFuture<'_, Result<UpstreamResponse, UpstreamError>> {
        self.execute(request).boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_with_and_without_timeout() {
        assert!(HttpUpstream::new(None).is_ok());
        assert!(HttpUpstream::new(Some(Duration::from_secs(5))).is_ok());
    }
}
