//! Deskgate - HTTP gateway for ServiceDesk Plus Cloud
//!
//! # Configuration
//!
//! Set the following environment variables (or use a `.env` file):
//!
//! - `ZOHO_CLIENT_ID`, `ZOHO_CLIENT_SECRET`, `ZOHO_REFRESH_TOKEN`
//! - `SDP_API_BASE_URL`: ServiceDesk Plus Cloud base URL
//!
//! # Usage
//!
//! ```bash
//! ./deskgate
//!
//! GATEWAY_BIND_ADDR=127.0.0.1:8080 RUST_LOG=deskgate=debug ./deskgate
//! ```

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing_subscriber::{fmt, EnvFilter};

use deskgate::{api_client, config, server, token_manager};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (ignore errors if not found)
    dotenvy::dotenv().ok();

    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("deskgate=info")),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    tracing::info!("Starting Deskgate v{}", env!("CARGO_PKG_VERSION"));

    let config = config::Config::from_env().context("Failed to load configuration")?;

    tracing::debug!(
        api_base_url = %config.credentials.api_base_url,
        accounts_base_url = %config.credentials.accounts_base_url,
        "Configuration loaded"
    );

    let tokens = Arc::new(
        token_manager::TokenManager::new(&config).context("Failed to create token manager")?,
    );
    let client = api_client::ApiClient::new(&config, Arc::clone(&tokens))
        .context("Failed to create SDP client")?;

    // Warm the token cache before accepting traffic
    tracing::info!("Fetching initial access token...");
    if let Err(e) = tokens.get_valid_token().await {
        tracing::error!(error = %e, "Initial token refresh failed");
        // Continue anyway - requests will retry the refresh
        tracing::warn!(
            "Server will start but cannot reach ServiceDesk Plus until a token is obtained. \
             Check the OAuth credentials and network connectivity."
        );
    }

    let app = server::router(server::AppState {
        client,
        tokens,
        ticket_view: config.ticket_view,
    });

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;

    tracing::info!(addr = %config.bind_addr, "Server running, waiting for requests");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error during operation")?;

    tracing::info!("Server shutting down");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
