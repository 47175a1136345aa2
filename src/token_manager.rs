//! Zoho OAuth access-token lifecycle.
//!
//! `TokenManager` owns the cached access token and its expiry, and mints new
//! tokens from the long-lived refresh token when the cache is empty or stale.
//!
//! # Concurrency
//!
//! The cached state sits behind a read/write lock; the fast path only takes
//! the read lock. Refreshes are serialized by a separate async mutex (the
//! refresh gate): a caller that finds the cache stale takes the gate,
//! re-checks the cache, and only then calls the token endpoint. Callers
//! queued behind an in-flight refresh therefore pick up its result instead of
//! issuing their own request.
//!
//! # Security
//!
//! OAuth secrets and access tokens are never logged. Token endpoint bodies
//! are sanitized before they are put into errors.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};

use crate::clock::{Clock, SystemClock};
use crate::config::{Config, Credentials};
use crate::error::GatewayError;
use crate::models::TokenResponse;

/// Path of the Zoho token endpoint, relative to the accounts server.
const TOKEN_PATH: &str = "/oauth/v2/token";

/// The cached access token and when it stops being usable.
///
/// Whenever `access_token` is set, `expires_at` is the refresh time plus the
/// declared lifetime minus the safety margin.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct TokenState {
    access_token: Option<String>,
    expires_at: Option<DateTime<Utc>>,
}

impl TokenState {
    /// Returns the token if it is usable at `now`.
    pub fn valid_token_at(&self, now: DateTime<Utc>) -> Option<&str> {
        match (self.access_token.as_deref(), self.expires_at) {
            (Some(token), Some(expires_at)) if !token.is_empty() && now < expires_at => {
                Some(token)
            }
            _ => None,
        }
    }

    /// Returns true if the token is usable at `now`.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.valid_token_at(now).is_some()
    }

    /// When the cached token stops being usable, if one is cached.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }
}

impl fmt::Debug for TokenState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenState")
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Point-in-time view of the cache, safe to expose on the health endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TokenStatus {
    /// Whether a usable token is cached right now.
    pub valid: bool,
    /// When the cached token stops being usable.
    pub expires_at: Option<DateTime<Utc>>,
}

/// Keeps a valid Zoho access token available for outbound calls.
pub struct TokenManager {
    /// HTTP client for the accounts server.
    http: Client,

    /// Shared credentials.
    /// SECURITY: never log the secret fields.
    credentials: Arc<Credentials>,

    /// Source of "now" for expiry math.
    clock: Arc<dyn Clock>,

    /// Subtracted from the declared token lifetime.
    safety_margin: chrono::Duration,

    /// Request timeout, for error reporting.
    timeout: Duration,

    /// Cached token.
    state: RwLock<TokenState>,

    /// Held for the duration of every refresh.
    refresh_gate: Mutex<()>,
}

impl TokenManager {
    /// Creates a token manager with an empty cache, using wall-clock time.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::HttpClient` if the HTTP client fails to initialize.
    pub fn new(config: &Config) -> Result<Self, GatewayError> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Creates a token manager with an empty cache and a custom clock.
    pub fn with_clock(config: &Config, clock: Arc<dyn Clock>) -> Result<Self, GatewayError> {
        let http = Client::builder()
            .connect_timeout(config.request_timeout)
            .timeout(config.request_timeout)
            .build()
            .map_err(GatewayError::HttpClient)?;

        let safety_margin = chrono::Duration::from_std(config.token_safety_margin)
            .map_err(|_| GatewayError::invalid_config("token safety margin is out of range"))?;

        Ok(Self {
            http,
            credentials: Arc::clone(&config.credentials),
            clock,
            safety_margin,
            timeout: config.request_timeout,
            state: RwLock::new(TokenState::default()),
            refresh_gate: Mutex::new(()),
        })
    }

    /// Returns an access token that is valid right now.
    ///
    /// Serves the cached token when it is still inside its validity window;
    /// otherwise refreshes it. Concurrent callers share a single refresh.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::Authentication` if the refresh fails. The cached
    /// state is left as it was.
    pub async fn get_valid_token(&self) -> Result<String, GatewayError> {
        if let Some(token) = self.cached_token().await {
            return Ok(token);
        }

        let _gate = self.refresh_gate.lock().await;

        // Another caller may have refreshed while we waited for the gate.
        if let Some(token) = self.cached_token().await {
            tracing::debug!("Using token refreshed by a concurrent caller");
            return Ok(token);
        }

        self.refresh_locked().await
    }

    /// Replaces a token the remote API rejected and returns its successor.
    ///
    /// If the cache already holds a different valid token, a concurrent
    /// caller has replaced the rejected one and it is returned without a
    /// network call. Otherwise the cache is cleared and refreshed once.
    pub async fn refresh_rejected(&self, rejected: &str) -> Result<String, GatewayError> {
        let _gate = self.refresh_gate.lock().await;

        let now = self.clock.now();
        {
            let state = self.state.read().await;
            if let Some(token) = state.valid_token_at(now) {
                if token != rejected {
                    tracing::debug!("Rejected token already replaced by a concurrent caller");
                    return Ok(token.to_string());
                }
            }
        }

        *self.state.write().await = TokenState::default();
        self.refresh_locked().await
    }

    /// Drops the cached token so the next call refreshes.
    pub async fn invalidate(&self) {
        let _gate = self.refresh_gate.lock().await;
        *self.state.write().await = TokenState::default();
        tracing::debug!("Access token invalidated");
    }

    /// Reports whether a usable token is cached, without refreshing.
    pub async fn status(&self) -> TokenStatus {
        let state = self.state.read().await;
        TokenStatus {
            valid: state.is_valid_at(self.clock.now()),
            expires_at: state.expires_at(),
        }
    }

    /// Copy of the cached state.
    #[cfg(test)]
    pub(crate) async fn snapshot(&self) -> TokenState {
        self.state.read().await.clone()
    }

    /// Fast-path read of the cache.
    async fn cached_token(&self) -> Option<String> {
        let now = self.clock.now();
        self.state
            .read()
            .await
            .valid_token_at(now)
            .map(str::to_string)
    }

    /// Calls the token endpoint and stores the result. Caller holds the gate.
    async fn refresh_locked(&self) -> Result<String, GatewayError> {
        tracing::info!("Refreshing Zoho access token");

        let response = self.request_token().await.inspect_err(|e| {
            tracing::error!(error = %e, "Access token refresh failed");
        })?;

        let Some(token) = response.token().map(str::to_string) else {
            let reason = response
                .error
                .as_deref()
                .unwrap_or("response did not contain an access_token");
            let err = GatewayError::authentication(
                None,
                GatewayError::sanitize_message(reason, &self.credentials.secrets()),
            );
            tracing::error!(error = %err, "Access token refresh failed");
            return Err(err);
        };

        let now = self.clock.now();
        let Some(expires_at) = chrono::Duration::try_seconds(response.ttl_secs())
            .and_then(|ttl| now.checked_add_signed(ttl))
            .and_then(|at| at.checked_sub_signed(self.safety_margin))
        else {
            let err = GatewayError::authentication(
                None,
                format!("invalid expires_in: {}", response.ttl_secs()),
            );
            tracing::error!(error = %err, "Access token refresh failed");
            return Err(err);
        };
        if expires_at <= now {
            tracing::warn!(
                ttl_secs = response.ttl_secs(),
                margin_secs = self.safety_margin.num_seconds(),
                "Token lifetime is shorter than the safety margin; it will be refreshed on every call"
            );
        }

        *self.state.write().await = TokenState {
            access_token: Some(token.clone()),
            expires_at: Some(expires_at),
        };

        tracing::info!(expires_at = %expires_at, "Access token refreshed");
        Ok(token)
    }

    /// Performs the `grant_type=refresh_token` exchange.
    async fn request_token(&self) -> Result<TokenResponse, GatewayError> {
        let url = format!("{}{}", self.credentials.accounts_base_url, TOKEN_PATH);
        let secrets = self.credentials.secrets();
        let params = [
            ("refresh_token", self.credentials.refresh_token.as_str()),
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("grant_type", "refresh_token"),
        ];

        let response = self
            .http
            .post(&url)
            .form(&params)
            .send()
            .await
            .map_err(|e| {
                let cause = GatewayError::from_transport(e, self.timeout, "POST /oauth/v2/token");
                GatewayError::authentication(
                    None,
                    GatewayError::sanitize_message(&cause.to_string(), &secrets),
                )
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            GatewayError::authentication(
                Some(status),
                GatewayError::sanitize_message(&e.to_string(), &secrets),
            )
        })?;

        if !status.is_success() {
            return Err(GatewayError::authentication(
                Some(status),
                GatewayError::sanitize_body(&body, &secrets),
            ));
        }

        serde_json::from_str(&body).map_err(|e| {
            GatewayError::authentication(
                Some(status),
                format!("unparseable token response: {}", e),
            )
        })
    }
}
