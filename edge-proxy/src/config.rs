//! Process configuration, sourced from environment variables.

use std::collections::HashMap;
use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;

use tracing::warn;

use crate::stations::StationCatalogConfig;

/// Default listen port (the one `wrangler dev` uses).
const DEFAULT_PORT: u16 = 8787;

/// User agent sent to upstreams that require one.
pub const DEFAULT_USER_AGENT: &str = "ControlRoom-Worker/1.0";

/// A server-held provider secret.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CredentialKey {
    CompaniesHouse,
    OsPlaces,
    Signalbox,
    Aviationstack,
    Dvla,
}

impl CredentialKey {
    pub const ALL: [CredentialKey; 5] = [
        CredentialKey::CompaniesHouse,
        CredentialKey::OsPlaces,
        CredentialKey::Signalbox,
        CredentialKey::Aviationstack,
        CredentialKey::Dvla,
    ];

    /// Environment variable holding the secret.
    pub fn env_var(self) -> &'static str {
        match self {
            CredentialKey::CompaniesHouse => "CH_API_KEY",
            CredentialKey::OsPlaces => "OS_PLACES_API_KEY",
            CredentialKey::Signalbox => "SIGNALBOX_API_KEY",
            CredentialKey::Aviationstack => "AVIATIONSTACK_API_KEY",
            CredentialKey::Dvla => "DVLA_API_KEY",
        }
    }
}

impl fmt::Display for CredentialKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.env_var())
    }
}

/// Provider credentials.
///
/// Blank values are treated as unset. `Debug` only lists which keys are
/// configured, never their values.
#[derive(Clone, Default)]
pub struct Credentials {
    values: HashMap<CredentialKey, String>,
}

impl Credentials {
    /// Create an empty credential set (nothing configured).
    pub fn new() -> Self {
        Self::default()
    }

    /// Read every known credential from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read credentials through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        CredentialKey::ALL
            .into_iter()
            .fold(Self::new(), |creds, key| match lookup(key.env_var()) {
                Some(value) => creds.with(key, value),
                None => creds,
            })
    }

    /// Set a credential. Blank values leave the key unset.
    pub fn with(mut self, key: CredentialKey, value: impl Into<String>) -> Self {
        let value = value.into().trim().to_string();
        if value.is_empty() {
            self.values.remove(&key);
        } else {
            self.values.insert(key, value);
        }
        self
    }

    /// Look up a credential.
    pub fn get(&self, key: CredentialKey) -> Option<&str> {
        self.values.get(&key).map(String::as_str)
    }

    pub fn is_configured(&self, key: CredentialKey) -> bool {
        self.values.contains_key(&key)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut configured: Vec<_> = self.values.keys().map(|k| k.env_var()).collect();
        configured.sort_unstable();
        f.debug_struct("Credentials")
            .field("configured", &configured)
            .finish()
    }
}

/// Top-level proxy configuration.
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    /// Address to listen on.
    pub addr: SocketAddr,
    /// Provider secrets.
    pub credentials: Credentials,
    /// Station catalog source and TTL.
    pub catalog: StationCatalogConfig,
    /// Optional timeout for upstream calls. `None` leaves requests unbounded.
    pub upstream_timeout: Option<Duration>,
    /// User agent for upstreams that require one.
    pub user_agent: String,
}

impl ProxyConfig {
    /// Build the configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the configuration through an arbitrary variable lookup.
    ///
    /// Unparseable values fall back to their defaults with a warning.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self {
            credentials: Credentials::from_lookup(&lookup),
            ..Self::default()
        };

        if let Some(raw) = lookup("PROXY_ADDR") {
            match raw.trim().parse() {
                Ok(addr) => config.addr = addr,
                Err(_) => warn!(value = %raw, "ignoring invalid PROXY_ADDR"),
            }
        }

        if let Some(url) = lookup("STATION_CATALOG_URL").filter(|u| !u.trim().is_empty()) {
            config.catalog = config.catalog.with_url(url.trim());
        }

        if let Some(secs) = parse_secs(&lookup, "STATION_CATALOG_TTL_SECS") {
            config.catalog = config.catalog.with_ttl(Duration::from_secs(secs));
        }

        config.upstream_timeout = parse_secs(&lookup, "UPSTREAM_TIMEOUT_SECS")
            .filter(|&secs| secs > 0)
            .map(Duration::from_secs);

        config
    }

    /// Replace the credentials.
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }

    /// Replace the catalog configuration.
    pub fn with_catalog(mut self, catalog: StationCatalogConfig) -> Self {
        self.catalog = catalog;
        self
    }
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([127, 0, 0, 1], DEFAULT_PORT)),
            credentials: Credentials::new(),
            catalog: StationCatalogConfig::default(),
            upstream_timeout: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

fn parse_secs(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<u64> {
    let raw = lookup(name)?;
    match raw.trim().parse() {
        Ok(secs) => Some(secs),
        Err(_) => {
            warn!(variable = name, value = %raw, "ignoring invalid duration");
            None
        }
    }
}
