//! Credential injection for outbound requests.
//!
//! Each [`AuthMode`] attaches a server-held secret to an [`UpstreamRequest`].
//! A missing secret is reported before anything is sent, so a provider never
//! sees an unauthenticated request for a route that needs auth.

use axum::http::{HeaderName, HeaderValue, header};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::config::{CredentialKey, Credentials};
use crate::providers::AuthMode;
use crate::upstream::UpstreamRequest;

/// A credential could not be attached.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CredentialError {
    #[error("{0} not configured")]
    Missing(CredentialKey),

    /// The secret contains bytes that can't go in a header.
    #[error("{0} is not a valid header value")]
    Invalid(CredentialKey),
}

impl AuthMode {
    /// The credential this mode needs, if any.
    pub fn credential(&self) -> Option<CredentialKey> {
        match *self {
            AuthMode::None => None,
            AuthMode::BasicFromEnv(key) | AuthMode::BearerFromEnv(key) => Some(key),
            AuthMode::ApiKeyQueryParam { key, .. } | AuthMode::ApiKeyHeader { key, .. } => {
                Some(key)
            }
        }
    }

    /// Fail if the credential this mode needs isn't configured.
    pub fn require(&self, credentials: &Credentials) -> Result<(), CredentialError> {
        match self.credential() {
            Some(key) if !credentials.is_configured(key) => Err(CredentialError::Missing(key)),
            _ => Ok(()),
        }
    }

    /// Attach the credential to `request`.
    pub fn apply(
        &self,
        credentials: &Credentials,
        request: &mut UpstreamRequest,
    ) -> Result<(), CredentialError> {
        let Some(key) = self.credential() else {
            return Ok(());
        };
        let secret = credentials.get(key).ok_or(CredentialError::Missing(key))?;

        match *self {
            AuthMode::None => {}
            AuthMode::BasicFromEnv(_) => {
                // The key is the username; the password is empty
                let encoded = STANDARD.encode(format!("{secret}:"));
                let value = sensitive(key, &format!("Basic {encoded}"))?;
                request.headers.insert(header::AUTHORIZATION, value);
            }
            AuthMode::BearerFromEnv(_) => {
                let value = sensitive(key, &format!("Bearer {secret}"))?;
                request.headers.insert(header::AUTHORIZATION, value);
            }
            AuthMode::ApiKeyQueryParam { param, .. } => {
                request.url.query_pairs_mut().append_pair(param, secret);
            }
            AuthMode::ApiKeyHeader { header, .. } => {
                let value = sensitive(key, secret)?;
                request
                    .headers
                    .insert(HeaderName::from_static(header), value);
            }
        }
        Ok(())
    }
}

fn sensitive(key: CredentialKey, value: &str) -> Result<HeaderValue, CredentialError> {
    let mut value = HeaderValue::from_str(value).map_err(|_| CredentialError::Invalid(key))?;
    value.set_sensitive(true);
    Ok(value)
}
