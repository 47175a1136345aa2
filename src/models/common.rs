//! Common types shared across SDP API models.
//!
//! This module defines the response envelope and status block every
//! ServiceDesk Plus v3 response may carry.

use reqwest::StatusCode;
use serde::Deserialize;

use crate::error::{codes, GatewayError};

/// Response status from SDP API.
///
/// SDP responses usually include this block to indicate success or failure.
#[derive(Debug, Clone, Deserialize)]
pub struct ResponseStatus {
    /// Status code: 2000 for success, 4000+ for errors.
    pub status_code: u32,

    /// Status string: "success" or "failed".
    #[serde(default)]
    pub status: String,

    /// Error messages (present on failure).
    #[serde(default)]
    pub messages: Vec<ResponseMessage>,
}

/// A single message in the response status.
#[derive(Debug, Clone, Deserialize)]
pub struct ResponseMessage {
    /// The error or info message.
    #[serde(default)]
    pub message: String,

    /// Status code for this specific message.
    #[serde(default)]
    pub status_code: Option<u32>,

    /// Type of message.
    #[serde(rename = "type", default)]
    pub message_type: Option<String>,
}

impl ResponseStatus {
    /// Returns true if the response indicates success.
    pub fn is_success(&self) -> bool {
        self.status_code == codes::SUCCESS
    }

    /// Best human-readable description of the status: the first message,
    /// then the status string, then a generic fallback.
    pub fn summary(&self) -> String {
        self.messages
            .first()
            .map(|m| m.message.clone())
            .filter(|m| !m.is_empty())
            .or_else(|| Some(self.status.clone()).filter(|s| !s.is_empty()))
            .unwrap_or_else(|| "Unknown error".to_string())
    }

    /// Returns true if SDP reports that the addressed record does not exist.
    pub fn is_not_found(&self) -> bool {
        self.status_code == codes::NOT_FOUND
    }

    /// Converts a failed response status into an `Upstream` error.
    ///
    /// `http_status` is the status of the HTTP response that carried the block.
    pub fn into_error(self, http_status: StatusCode) -> GatewayError {
        GatewayError::upstream(
            http_status,
            format!("SDP error {}: {}", self.status_code, self.summary()),
        )
    }
}

/// Generic wrapper for SDP API responses.
///
/// The status block is optional: some deployments omit it on success.
#[derive(Debug, Clone, Deserialize)]
pub struct SdpResponse<T> {
    /// Response status indicating success or failure, when present.
    #[serde(default)]
    pub response_status: Option<ResponseStatus>,

    /// The actual response data.
    #[serde(flatten)]
    pub data: T,
}

impl<T> SdpResponse<T> {
    /// Converts the response into a Result, checking the status if present.
    pub fn into_result(self, http_status: StatusCode) -> Result<T, GatewayError> {
        match self.response_status {
            Some(status) if !status.is_success() => Err(status.into_error(http_status)),
            _ => Ok(self.data),
        }
    }
}

/// Response wrapper for single request operations.
#[derive(Debug, Clone, Deserialize)]
pub struct GetRequestResponse {
    /// The full request details.
    pub request: super::Request,
}

/// Response wrapper for request creation; only the new ID is read.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateRequestResponse {
    /// The created request, if the body carried one.
    #[serde(default)]
    pub request: Option<super::RequestRef>,
}

/// Response wrapper for pass-through fetches.
#[derive(Debug, Clone, Deserialize)]
pub struct RawRequestResponse {
    /// The remote request object, untouched.
    pub request: serde_json::Value,
}

/// Extracts a readable error message from an arbitrary SDP error body.
///
/// Falls back to the raw body when it is not a recognizable SDP payload.
pub fn extract_error_message(body: &str) -> String {
    match response_status_of(body) {
        Some(status) => status.summary(),
        None => body.to_string(),
    }
}

/// Reads only the `response_status` block of a body, ignoring everything else.
pub fn response_status_of(body: &str) -> Option<ResponseStatus> {
    #[derive(Deserialize)]
    struct StatusEnvelope {
        response_status: Option<ResponseStatus>,
    }

    serde_json::from_str::<StatusEnvelope>(body)
        .ok()
        .and_then(|envelope| envelope.response_status)
}
