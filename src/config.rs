//! Configuration management for the deskgate gateway.
//!
//! This module handles loading configuration from environment variables,
//! with validation to ensure all required values are present.

use std::env;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use url::Url;

use crate::error::GatewayError;

/// Default Zoho accounts server used for token refresh.
pub const DEFAULT_ACCOUNTS_URL: &str = "https://accounts.zoho.com";

/// Default listen address for the gateway.
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:5000";

/// Default outbound request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default margin subtracted from the declared token lifetime, in seconds.
pub const DEFAULT_SAFETY_MARGIN_SECS: u64 = 60;

/// Default number of retries after the remote rejects a token.
pub const DEFAULT_MAX_AUTH_RETRIES: u32 = 1;

/// OAuth credentials and remote endpoints, loaded once at startup.
///
/// Immutable after load. The client secret and refresh token must never be
/// logged; the `Debug` impl redacts them.
#[derive(Clone)]
pub struct Credentials {
    /// Zoho OAuth client ID.
    pub client_id: String,

    /// Zoho OAuth client secret.
    pub client_secret: String,

    /// Long-lived refresh token used to mint access tokens.
    pub refresh_token: String,

    /// Zoho accounts server (e.g. `https://accounts.zoho.com`).
    pub accounts_base_url: String,

    /// ServiceDesk Plus Cloud base URL (e.g. `https://sdpondemand.manageengine.com/app/itdesk`).
    pub api_base_url: String,
}

impl Credentials {
    /// Values that must be scrubbed from any message derived from remote output.
    pub fn secrets(&self) -> [&str; 2] {
        [self.client_secret.as_str(), self.refresh_token.as_str()]
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("accounts_base_url", &self.accounts_base_url)
            .field("api_base_url", &self.api_base_url)
            .finish()
    }
}

/// Which representation `GET /get_ticket/{id}` returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TicketView {
    /// Projected [`TicketSummary`](crate::models::TicketSummary).
    #[default]
    Summary,
    /// The remote request object, passed through unchanged.
    Full,
}

impl FromStr for TicketView {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "summary" => Ok(TicketView::Summary),
            "full" => Ok(TicketView::Full),
            other => Err(GatewayError::invalid_config(format!(
                "GATEWAY_TICKET_VIEW must be 'summary' or 'full', got {:?}",
                other
            ))),
        }
    }
}

/// Complete gateway configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Shared OAuth credentials and endpoints.
    pub credentials: Arc<Credentials>,

    /// Address the HTTP listener binds to.
    pub bind_addr: String,

    /// Timeout applied to every outbound call (connect and total).
    pub request_timeout: Duration,

    /// Margin subtracted from the declared token lifetime.
    pub token_safety_margin: Duration,

    /// How many times a call is retried after the remote rejects the token.
    pub max_auth_retries: u32,

    /// Representation returned by the get-ticket route.
    pub ticket_view: TicketView,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// # Required Environment Variables
    ///
    /// - `ZOHO_CLIENT_ID`, `ZOHO_CLIENT_SECRET`, `ZOHO_REFRESH_TOKEN`
    /// - `SDP_API_BASE_URL`: ServiceDesk Plus Cloud base URL
    ///
    /// # Optional Environment Variables
    ///
    /// | Variable                   | Default                     |
    /// |----------------------------|-----------------------------|
    /// | `ZOHO_ACCOUNTS_URL`        | `https://accounts.zoho.com` |
    /// | `GATEWAY_BIND_ADDR`        | `0.0.0.0:5000`              |
    /// | `SDP_TIMEOUT_SECS`         | `30`                        |
    /// | `TOKEN_SAFETY_MARGIN_SECS` | `60`                        |
    /// | `SDP_MAX_AUTH_RETRIES`     | `1`                         |
    /// | `GATEWAY_TICKET_VIEW`      | `summary`                   |
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::Config` if any required variable is missing
    /// or if values fail validation.
    pub fn from_env() -> Result<Self, GatewayError> {
        let client_id = Self::get_required_env("ZOHO_CLIENT_ID")?;
        let client_secret = Self::get_required_env("ZOHO_CLIENT_SECRET")?;
        let refresh_token = Self::get_required_env("ZOHO_REFRESH_TOKEN")?;

        Self::validate_secret("ZOHO_CLIENT_SECRET", &client_secret)?;
        Self::validate_secret("ZOHO_REFRESH_TOKEN", &refresh_token)?;

        let accounts_base_url = Self::validate_base_url(
            "ZOHO_ACCOUNTS_URL",
            Self::get_optional_env("ZOHO_ACCOUNTS_URL")
                .unwrap_or_else(|| DEFAULT_ACCOUNTS_URL.to_string()),
        )?;
        let api_base_url =
            Self::validate_base_url("SDP_API_BASE_URL", Self::get_required_env("SDP_API_BASE_URL")?)?;

        let bind_addr = Self::get_optional_env("GATEWAY_BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let timeout_secs = Self::parse_optional_env("SDP_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?;
        if timeout_secs == 0 {
            return Err(GatewayError::invalid_config(
                "SDP_TIMEOUT_SECS must be greater than zero",
            ));
        }
        let margin_secs =
            Self::parse_optional_env("TOKEN_SAFETY_MARGIN_SECS", DEFAULT_SAFETY_MARGIN_SECS)?;
        let max_auth_retries =
            Self::parse_optional_env("SDP_MAX_AUTH_RETRIES", DEFAULT_MAX_AUTH_RETRIES)?;
        let ticket_view = match Self::get_optional_env("GATEWAY_TICKET_VIEW") {
            Some(value) => value.parse()?,
            None => TicketView::default(),
        };

        Ok(Config {
            credentials: Arc::new(Credentials {
                client_id,
                client_secret,
                refresh_token,
                accounts_base_url,
                api_base_url,
            }),
            bind_addr,
            request_timeout: Duration::from_secs(timeout_secs),
            token_safety_margin: Duration::from_secs(margin_secs),
            max_auth_retries,
            ticket_view,
        })
    }

    /// Builds a configuration with default gateway settings around the given credentials.
    pub fn with_credentials(credentials: Credentials) -> Self {
        Config {
            credentials: Arc::new(credentials),
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            token_safety_margin: Duration::from_secs(DEFAULT_SAFETY_MARGIN_SECS),
            max_auth_retries: DEFAULT_MAX_AUTH_RETRIES,
            ticket_view: TicketView::default(),
        }
    }

    /// Gets a required environment variable, returning an error if missing or empty.
    fn get_required_env(name: &str) -> Result<String, GatewayError> {
        Self::get_optional_env(name).ok_or_else(|| GatewayError::missing_env(name))
    }

    /// Gets an optional environment variable, treating blank values as unset.
    fn get_optional_env(name: &str) -> Option<String> {
        env::var(name)
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }

    /// Parses an optional environment variable, falling back to `default`.
    fn parse_optional_env<T: FromStr>(name: &str, default: T) -> Result<T, GatewayError> {
        match Self::get_optional_env(name) {
            Some(raw) => raw.parse().map_err(|_| {
                GatewayError::invalid_config(format!("{} has an invalid value: {:?}", name, raw))
            }),
            None => Ok(default),
        }
    }

    /// Validates and normalizes a base URL.
    fn validate_base_url(name: &str, url: String) -> Result<String, GatewayError> {
        // Remove trailing slash for consistency
        let url = url.trim().trim_end_matches('/').to_string();

        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(GatewayError::invalid_config(format!(
                "{} must start with http:// or https://",
                name
            )));
        }

        Url::parse(&url).map_err(|e| {
            GatewayError::invalid_config(format!("{} is not a valid URL: {}", name, e))
        })?;

        Ok(url)
    }

    /// Validates a secret is not a placeholder value.
    fn validate_secret(name: &str, value: &str) -> Result<(), GatewayError> {
        let lower = value.to_lowercase();
        let placeholder_patterns = ["your_", "placeholder", "xxx", "changeme"];

        if placeholder_patterns.iter().any(|p| lower.contains(p)) {
            return Err(GatewayError::invalid_config(format!(
                "{} appears to be a placeholder value",
                name
            )));
        }

        Ok(())
    }
}
