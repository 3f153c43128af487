//! In-memory station catalog with TTL refresh.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

use crate::domain::StationRecord;
use crate::providers::Provider;
use crate::upstream::UpstreamError;

use super::client::StationSource;

/// Default catalog TTL: 6 hours.
const DEFAULT_TTL: Duration = Duration::from_secs(6 * 60 * 60);

/// Configuration for the station catalog.
#[derive(Debug, Clone)]
pub struct StationCatalogConfig {
    /// Dataset URL.
    pub url: String,
    /// How long a snapshot is served before it is refetched.
    pub ttl: Duration,
}

impl StationCatalogConfig {
    /// Config for the given dataset URL with the default TTL (6 hours).
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ttl: DEFAULT_TTL,
        }
    }

    /// Set a custom dataset URL.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Set a custom TTL.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }
}

impl Default for StationCatalogConfig {
    fn default() -> Self {
        Self::new(Provider::StationCatalog.base_url())
    }
}

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// An immutable view of the catalog.
#[derive(Debug)]
pub struct Snapshot {
    /// Stations in upstream order.
    pub stations: Vec<StationRecord>,
    pub fetched_at: DateTime<Utc>,
}

/// The station catalog.
///
/// Readers get an `Arc<Snapshot>` and never block a refresh: a refresh
/// builds a whole new snapshot and swaps it in, while anyone still holding
/// the old one keeps using it. Refreshes are serialised so that a burst of
/// callers finding the snapshot expired causes a single upstream fetch,
/// and a failed fetch is reported to everyone who was waiting on it.
pub struct StationCatalog {
    source: StationSource,
    ttl: Duration,
    clock: Arc<dyn Clock>,
    current: RwLock<Option<Arc<Snapshot>>>,
    /// Completed fetch attempts, bumped while `refreshing` is held.
    attempts: AtomicU64,
    /// Held for the duration of a fetch; remembers the last failure.
    refreshing: Mutex<Option<Arc<UpstreamError>>>,
}

impl StationCatalog {
    pub fn new(source: StationSource, config: &StationCatalogConfig) -> Self {
        Self {
            source,
            ttl: config.ttl,
            clock: Arc::new(SystemClock),
            current: RwLock::new(None),
            attempts: AtomicU64::new(0),
            refreshing: Mutex::new(None),
        }
    }

    /// Use a different clock (for tests).
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Get a snapshot no older than the TTL, fetching one if necessary.
    ///
    /// Fetch failures are returned to the caller; an expired snapshot is
    /// never served in place of a failed refresh.
    pub async fn get(&self) -> Result<Arc<Snapshot>, UpstreamError> {
        let seen = self.attempts.load(Ordering::Acquire);
        if let Some(snapshot) = self.fresh().await {
            return Ok(snapshot);
        }

        let mut last_failure = self.refreshing.lock().await;
        // Someone else may have refreshed while we waited
        if let Some(snapshot) = self.fresh().await {
            return Ok(snapshot);
        }
        if self.attempts.load(Ordering::Acquire) != seen {
            if let Some(failure) = last_failure.as_ref() {
                return Err(UpstreamError::Shared(Arc::clone(failure)));
            }
        }
        self.attempt(&mut last_failure).await
    }

    /// Fetch a new snapshot regardless of the current one's age.
    pub async fn refresh(&self) -> Result<Arc<Snapshot>, UpstreamError> {
        let mut last_failure = self.refreshing.lock().await;
        self.attempt(&mut last_failure).await
    }

    /// The current snapshot, whatever its age.
    pub async fn snapshot(&self) -> Option<Arc<Snapshot>> {
        self.current.read().await.clone()
    }

    async fn fresh(&self) -> Option<Arc<Snapshot>> {
        let current = self.current.read().await;
        current
            .as_ref()
            .filter(|snapshot| !self.is_expired(snapshot))
            .cloned()
    }

    fn is_expired(&self, snapshot: &Snapshot) -> bool {
        // A snapshot from the future (clock skew) counts as brand new
        let age = (self.clock.now() - snapshot.fetched_at)
            .to_std()
            .unwrap_or(Duration::ZERO);
        age > self.ttl
    }

    /// Run one fetch. The caller holds `refreshing`.
    async fn attempt(
        &self,
        last_failure: &mut Option<Arc<UpstreamError>>,
    ) -> Result<Arc<Snapshot>, UpstreamError> {
        let result = self.fetch_and_publish().await;
        self.attempts.fetch_add(1, Ordering::Release);
        match result {
            Ok(snapshot) => {
                *last_failure = None;
                Ok(snapshot)
            }
            Err(e) => {
                let failure = Arc::new(e);
                *last_failure = Some(Arc::clone(&failure));
                Err(UpstreamError::Shared(failure))
            }
        }
    }

    async fn fetch_and_publish(&self) -> Result<Arc<Snapshot>, UpstreamError> {
        let stations = self.source.fetch_all().await.inspect_err(|e| {
            warn!(error = %e, "station catalog refresh failed");
        })?;

        let snapshot = Arc::new(Snapshot {
            stations,
            fetched_at: self.clock.now(),
        });
        info!(stations = snapshot.stations.len(), "station catalog refreshed");

        *self.current.write().await = Some(Arc::clone(&snapshot));
        Ok(snapshot)
    }
}
