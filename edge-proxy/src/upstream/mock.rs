//! Scripted upstream for testing without network access.
//!
//! Replies are registered against URL prefixes; the longest matching prefix
//! wins. Every request is recorded so tests can assert on exactly what
//! would have been sent (or that nothing was).

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode, header};
use futures::FutureExt;
use futures::future::BoxFuture;
use url::Url;

use crate::providers::Provider;

use super::error::UpstreamError;
use super::{Upstream, UpstreamRequest, UpstreamResponse};

/// A scripted reply.
#[derive(Debug, Clone)]
pub enum MockReply {
    /// JSON body with the given status.
    Json(StatusCode, serde_json::Value),
    /// Arbitrary body and content type.
    Raw {
        status: StatusCode,
        content_type: &'static str,
        body: Bytes,
    },
    /// Simulated transport failure.
    Fail(String),
    /// Panic while answering.
    Panic(&'static str),
}

impl MockReply {
    /// A 200 JSON reply.
    pub fn ok(value: serde_json::Value) -> Self {
        MockReply::Json(StatusCode::OK, value)
    }
}

/// A request the mock received.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub provider: Provider,
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
}

impl RecordedRequest {
    /// Value of a query parameter on the request URL.
    pub fn query_param(&self, name: &str) -> Option<String> {
        self.url
            .query_pairs()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.into_owned())
    }

    /// Value of a header, if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

#[derive(Default)]
struct MockState {
    replies: Vec<(String, MockReply)>,
    requests: Vec<RecordedRequest>,
}

/// In-memory upstream.
#[derive(Clone, Default)]
pub struct MockUpstream {
    state: Arc<Mutex<MockState>>,
    delay: Option<Duration>,
}

impl MockUpstream {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a reply for every URL starting with `url_prefix`.
    pub fn respond(self, url_prefix: impl Into<String>, reply: MockReply) -> Self {
        self.lock().replies.push((url_prefix.into(), reply));
        self
    }

    /// Delay every reply (to exercise concurrent callers).
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// All requests received so far.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.lock().requests.clone()
    }

    /// Number of requests received so far.
    pub fn request_count(&self) -> usize {
        self.lock().requests.len()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        // A panicking test thread shouldn't hide what was recorded
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn reply_for(&self, request: UpstreamRequest) -> Option<MockReply> {
        let mut state = self.lock();
        let url = request.url.as_str().to_string();
        state.requests.push(RecordedRequest {
            provider: request.provider,
            method: request.method,
            url: request.url,
            headers: request.headers,
            body: request.body,
        });

        state
            .replies
            .iter()
            .filter(|(prefix, _)| url.starts_with(prefix.as_str()))
            .max_by_key(|(prefix, _)| prefix.len())
            .map(|(_, reply)| reply.clone())
    }
}

fn response(status: StatusCode, content_type: &'static str, body: Bytes) -> UpstreamResponse {
    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    UpstreamResponse {
        status,
        headers,
        body: Body::from(body),
    }
}

impl Upstream for MockUpstream {
    fn send(
        &self,
        request: UpstreamRequest,
    ) -> BoxFuture<'_, Result<UpstreamResponse, UpstreamError>> {
        let reply = self.reply_for(request);
        let delay = self.delay;

        async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }

            match reply {
                Some(MockReply::Json(status, value)) => Ok(response(
                    status,
                    "application/json",
                    Bytes::from(value.to_string()),
                )),
                Some(MockReply::Raw {
                    status,
                    content_type,
                    body,
                }) => Ok(response(status, content_type, body)),
                Some(MockReply::Fail(message)) => Err(UpstreamError::Transport(message)),
                Some(MockReply::Panic(message)) => panic!("{message}"),
                None => Ok(response(
                    StatusCode::NOT_FOUND,
                    "application/json",
                    Bytes::from_static(br#"{"error":"no mock reply"}"#),
                )),
            }
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[tokio::test]
    async fn longest_prefix_wins() {
        let mock = MockUpstream::new()
            .respond("https://api.tfl.gov.uk/", MockReply::ok(serde_json::json!("general")))
            .respond(
                "https://api.tfl.gov.uk/Line",
                MockReply::ok(serde_json::json!("specific")),
            );

        let response = mock
            .send(UpstreamRequest::get(
                Provider::Tfl,
                url("https://api.tfl.gov.uk/Line/victoria/Status"),
            ))
            .await
            .unwrap();

        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(body, serde_json::json!("specific"));
    }

    #[tokio::test]
    async fn records_requests_and_defaults_to_404() {
        let mock = MockUpstream::new();
        let response = mock
            .send(UpstreamRequest::get(
                Provider::Postcodes,
                url("https://api.postcodes.io/postcodes/SW1A1AA?x=1"),
            ))
            .await
            .unwrap();

        assert_eq!(response.status, StatusCode::NOT_FOUND);
        let requests = mock.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].provider, Provider::Postcodes);
        assert_eq!(requests[0].query_param("x").as_deref(), Some("1"));
        assert_eq!(requests[0].header("accept"), Some("application/json"));
    }

    #[tokio::test]
    async fn simulated_failure() {
        let mock = MockUpstream::new()
            .respond("https://api.tfl.gov.uk", MockReply::Fail("connection reset".into()));

        let result = mock
            .send(UpstreamRequest::get(Provider::Tfl, url("https://api.tfl.gov.uk/")))
            .await;

        assert!(matches!(result, Err(UpstreamError::Transport(_))));
    }
}
