//! Error types for the deskgate gateway.
//!
//! This module defines `GatewayError`, the unified error type used throughout
//! the gateway, and its mapping onto HTTP responses at the route boundary.
//!
//! # Security
//!
//! Messages built from remote response bodies are sanitized so the client
//! secret, refresh token and access tokens never reach logs or callers. Use
//! `sanitize_message()` when constructing error messages from external sources.

use std::time::Duration;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Common SDP API status codes found in `response_status` blocks.
pub mod codes {
    /// Success response.
    pub const SUCCESS: u32 = 2000;
    /// Resource not found.
    pub const NOT_FOUND: u32 = 4005;
}

/// Maximum length for remote bodies carried in errors, to avoid leaking verbose SDP internals.
pub const MAX_ERROR_BODY_LEN: usize = 500;

/// Unified error type for all gateway operations.
///
/// Each variant maps onto one caller-facing error kind (see [`GatewayError::kind`])
/// and one HTTP status (see [`GatewayError::status_code`]).
#[derive(Error, Debug)]
pub enum GatewayError {
    /// Configuration error - missing or invalid environment variables.
    #[error("configuration error: {0}")]
    Config(String),

    /// HTTP client initialization failed.
    #[error("HTTP client error: {0}")]
    HttpClient(#[source] reqwest::Error),

    /// Inbound input failed validation. Never reaches the token manager.
    #[error("validation error: {message}")]
    Validation {
        /// Human-readable description of the problem.
        message: String,
        /// Required fields that were missing or empty, in declaration order.
        missing_fields: Vec<String>,
    },

    /// Token refresh against the Zoho accounts server failed.
    #[error("authentication failed: {message}")]
    Authentication {
        /// HTTP status returned by the accounts server, if a response arrived.
        status: Option<StatusCode>,
        /// Sanitized reason or response body.
        message: String,
    },

    /// ServiceDesk Plus returned an unexpected non-success response.
    #[error("upstream returned {status}: {body}")]
    Upstream {
        /// The HTTP status code returned.
        status: StatusCode,
        /// The sanitized, truncated response body or remote message.
        body: String,
    },

    /// The requested ticket does not exist upstream.
    #[error("ticket not found: {id}")]
    NotFound {
        /// The ID of the ticket that was not found.
        id: String,
    },

    /// Connection-level failure talking to a remote endpoint.
    #[error("network error: {0}")]
    Network(#[source] reqwest::Error),

    /// Request timed out.
    #[error("request timed out after {duration:?} - the server may be slow or unreachable")]
    Timeout {
        /// How long we waited before timing out.
        duration: Duration,
        /// The operation that timed out.
        operation: String,
    },

    /// JSON serialization or deserialization failed.
    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl GatewayError {
    /// Creates a configuration error for a missing environment variable.
    pub fn missing_env(var_name: &str) -> Self {
        GatewayError::Config(format!(
            "missing required environment variable: {}",
            var_name
        ))
    }

    /// Creates a configuration error for an invalid value.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        GatewayError::Config(message.into())
    }

    /// Creates a validation error that is not tied to specific missing fields.
    pub fn validation(message: impl Into<String>) -> Self {
        GatewayError::Validation {
            message: message.into(),
            missing_fields: Vec::new(),
        }
    }

    /// Creates a validation error listing missing required fields.
    pub fn missing_fields(fields: Vec<String>) -> Self {
        GatewayError::Validation {
            message: format!("Missing required fields: {}", fields.join(", ")),
            missing_fields: fields,
        }
    }

    /// Creates an authentication error.
    pub fn authentication(status: Option<StatusCode>, message: impl Into<String>) -> Self {
        GatewayError::Authentication {
            status,
            message: message.into(),
        }
    }

    /// Creates an upstream error.
    pub fn upstream(status: StatusCode, body: impl Into<String>) -> Self {
        GatewayError::Upstream {
            status,
            body: body.into(),
        }
    }

    /// Creates a not found error for a ticket ID.
    pub fn not_found(id: impl Into<String>) -> Self {
        GatewayError::NotFound { id: id.into() }
    }

    /// Creates a timeout error.
    pub fn timeout(duration: Duration, operation: impl Into<String>) -> Self {
        GatewayError::Timeout {
            duration,
            operation: operation.into(),
        }
    }

    /// Classifies a transport-level `reqwest` failure.
    pub fn from_transport(err: reqwest::Error, duration: Duration, operation: &str) -> Self {
        if err.is_timeout() {
            GatewayError::timeout(duration, operation)
        } else {
            GatewayError::Network(err)
        }
    }

    /// Machine-readable error kind rendered to callers.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            GatewayError::Config(_) | GatewayError::HttpClient(_) => "internal_error",
            GatewayError::Validation { .. } => "validation_error",
            GatewayError::Authentication { .. } => "authentication_error",
            GatewayError::Upstream { .. } | GatewayError::Serialization(_) => "upstream_error",
            GatewayError::NotFound { .. } => "not_found",
            GatewayError::Network(_) | GatewayError::Timeout { .. } => "network_error",
        }
    }

    /// HTTP status the route layer answers with for this error.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::Config(_) | GatewayError::HttpClient(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            GatewayError::Validation { .. } => StatusCode::BAD_REQUEST,
            GatewayError::Authentication { .. } => StatusCode::SERVICE_UNAVAILABLE,
            GatewayError::Upstream { .. } | GatewayError::Serialization(_) => {
                StatusCode::BAD_GATEWAY
            }
            GatewayError::NotFound { .. } => StatusCode::NOT_FOUND,
            GatewayError::Network(_) => StatusCode::BAD_GATEWAY,
            GatewayError::Timeout { .. } => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// The remote status code, when the failure came from an HTTP response.
    #[must_use]
    pub fn upstream_status(&self) -> Option<StatusCode> {
        match self {
            GatewayError::Upstream { status, .. } => Some(*status),
            GatewayError::Authentication { status, .. } => *status,
            _ => None,
        }
    }

    /// Sanitizes an error message by replacing every secret with `[REDACTED]`.
    ///
    /// Empty secrets are skipped so they cannot match everywhere.
    #[must_use]
    pub fn sanitize_message(message: &str, secrets: &[&str]) -> String {
        secrets
            .iter()
            .filter(|secret| !secret.is_empty())
            .fold(message.to_string(), |acc, secret| {
                acc.replace(secret, "[REDACTED]")
            })
    }

    /// Sanitizes and truncates a remote response body.
    #[must_use]
    pub fn sanitize_body(body: &str, secrets: &[&str]) -> String {
        let body = Self::sanitize_message(body, secrets);
        if body.len() > MAX_ERROR_BODY_LEN {
            let mut end = MAX_ERROR_BODY_LEN;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}...[truncated]", &body[..end])
        } else {
            body
        }
    }
}

/// JSON body rendered for every failed inbound request.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Error kind, e.g. `validation_error`.
    pub error: &'static str,
    /// Human-readable message.
    pub message: String,
    /// Remote HTTP status, for upstream and authentication failures.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upstream_status: Option<u16>,
    /// Missing required fields, for validation failures.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub missing_fields: Vec<String>,
}

impl From<&GatewayError> for ErrorBody {
    fn from(err: &GatewayError) -> Self {
        let message = match err {
            // Internal details stay in the logs.
            GatewayError::Config(_) | GatewayError::HttpClient(_) => {
                "Internal server error".to_string()
            }
            GatewayError::Validation { message, .. } => message.clone(),
            other => other.to_string(),
        };
        let missing_fields = match err {
            GatewayError::Validation { missing_fields, .. } => missing_fields.clone(),
            _ => Vec::new(),
        };
        ErrorBody {
            error: err.kind(),
            message,
            upstream_status: err.upstream_status().map(|s| s.as_u16()),
            missing_fields,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, kind = self.kind(), "Request failed");
        } else {
            tracing::debug!(error = %self, kind = self.kind(), "Request rejected");
        }
        (status, Json(ErrorBody::from(&self))).into_response()
    }
}
