//! Application state for the web layer.

use std::sync::Arc;

use axum::http::HeaderValue;

use crate::config::{Credentials, DEFAULT_USER_AGENT, ProxyConfig};
use crate::stations::{StationCatalog, StationSource};
use crate::upstream::Upstream;

/// Shared application state.
///
/// Everything here is immutable except the station catalog, which
/// manages its own locking.
#[derive(Clone)]
pub struct AppState {
    /// Provider secrets
    pub credentials: Arc<Credentials>,

    /// Outbound HTTP
    pub upstream: Arc<dyn Upstream>,

    /// Station dataset cache
    pub catalog: Arc<StationCatalog>,

    /// Sent to providers that ask callers to identify themselves
    pub user_agent: HeaderValue,
}

impl AppState {
    /// Create a new app state.
    pub fn new(config: &ProxyConfig, upstream: Arc<dyn Upstream>) -> Self {
        let source = StationSource::new(
            Arc::clone(&upstream),
            config.catalog.url.clone(),
            &config.user_agent,
        );

        Self {
            credentials: Arc::new(config.credentials.clone()),
            catalog: Arc::new(StationCatalog::new(source, &config.catalog)),
            upstream,
            user_agent: HeaderValue::from_str(&config.user_agent)
                .unwrap_or_else(|_| HeaderValue::from_static(DEFAULT_USER_AGENT)),
        }
    }

    /// Replace the station catalog.
    pub fn with_catalog(mut self, catalog: StationCatalog) -> Self {
        self.catalog = Arc::new(catalog);
        self
    }
}
