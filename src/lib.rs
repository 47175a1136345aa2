//! # Deskgate
//!
//! Deskgate is a small HTTP gateway in front of ServiceDesk Plus Cloud.
//!
//! It accepts simplified ticket JSON from internal callers, keeps a Zoho OAuth
//! access token fresh, and translates calls into the ServiceDesk Plus v3 API.
//!
//! ## Features
//!
//! - **Ticket creation**: validated input wrapped in the SDP request envelope
//! - **Ticket lookup**: a compact summary, or the remote object unchanged
//! - **Token caching**: one refresh at a time, shared by all concurrent callers
//! - **Auth recovery**: a request rejected with 401 is retried once with a new token
//! - **Security**: OAuth secrets and tokens never appear in logs or error bodies
//!
//! ## Architecture
//!
//! - [`config`] - Configuration loading from environment variables
//! - [`error`] - Error type and its mapping to HTTP responses
//! - [`clock`] - Time source used for token expiry
//! - [`token_manager`] - OAuth access token cache and refresh
//! - [`api_client`] - HTTP client for the ServiceDesk Plus API
//! - [`inputs`] - Inbound request bodies and their validation
//! - [`models`] - Data models for SDP API requests and responses
//! - [`server`] - axum router and handlers
//!
//! ## Configuration
//!
//! Required:
//!
//! - `ZOHO_CLIENT_ID`, `ZOHO_CLIENT_SECRET`, `ZOHO_REFRESH_TOKEN`
//! - `SDP_API_BASE_URL`: e.g. `https://sdpondemand.manageengine.com/app/itdesk`
//!
//! Optional:
//! - `ZOHO_ACCOUNTS_URL`, `GATEWAY_BIND_ADDR`, `SDP_TIMEOUT_SECS`,
//!   `TOKEN_SAFETY_MARGIN_SECS`, `SDP_MAX_AUTH_RETRIES`, `GATEWAY_TICKET_VIEW`
//! - `RUST_LOG`: Log level (e.g., `deskgate=debug`)
//!
//! ## Example
//!
//! Using the [`ApiClient`](api_client::ApiClient) directly:
//!
//! ```ignore
//! use std::sync::Arc;
//! use deskgate::{api_client::ApiClient, config::Config, token_manager::TokenManager};
//!
//! async fn example() -> Result<(), deskgate::error::GatewayError> {
//!     let config = Config::from_env()?;
//!     let tokens = Arc::new(TokenManager::new(&config)?);
//!     let client = ApiClient::new(&config, tokens)?;
//!
//!     let summary = client.fetch_ticket("131260000174674420").await?;
//!     println!("#{}: {} ({})", summary.ticket_id, summary.status, summary.technician_assigned);
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod api_client;
pub mod clock;
pub mod config;
pub mod error;
pub mod inputs;
pub mod models;
pub mod server;
pub mod token_manager;
