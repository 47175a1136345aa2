//! Zoho OAuth token endpoint response.

use serde::Deserialize;

/// Lifetime assumed when the accounts server omits `expires_in`.
pub const DEFAULT_TOKEN_TTL_SECS: i64 = 3600;

/// Body returned by `POST /oauth/v2/token`.
///
/// Zoho answers some failures with HTTP 200 and an `error` field instead of
/// a token, so every field is optional.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    /// The new access token.
    #[serde(default)]
    pub access_token: Option<String>,

    /// Lifetime of the access token in seconds.
    #[serde(default)]
    pub expires_in: Option<i64>,

    /// API domain the token is valid for.
    #[serde(default)]
    pub api_domain: Option<String>,

    /// Token type, normally "Bearer".
    #[serde(default)]
    pub token_type: Option<String>,

    /// Error code, e.g. "invalid_code".
    #[serde(default)]
    pub error: Option<String>,
}

impl TokenResponse {
    /// Returns the access token if present and non-empty.
    pub fn token(&self) -> Option<&str> {
        self.access_token.as_deref().filter(|t| !t.is_empty())
    }

    /// Declared lifetime in seconds, defaulting to one hour.
    pub fn ttl_secs(&self) -> i64 {
        self.expires_in.unwrap_or(DEFAULT_TOKEN_TTL_SECS)
    }
}
