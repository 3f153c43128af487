use std::sync::Arc;

use edge_proxy::config::{CredentialKey, ProxyConfig};
use edge_proxy::upstream::HttpUpstream;
use edge_proxy::web::{AppState, create_router};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = ProxyConfig::from_env();
    for key in CredentialKey::ALL {
        if !config.credentials.is_configured(key) {
            warn!(variable = key.env_var(), "credential not set; routes that need it will report it unconfigured");
        }
    }

    let upstream = HttpUpstream::new(config.upstream_timeout)?;
    let state = AppState::new(&config, Arc::new(upstream));
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    info!(addr = %config.addr, "edge proxy listening");
    axum::serve(listener, app).await?;
    Ok(())
}
