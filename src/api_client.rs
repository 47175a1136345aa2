//! HTTP client for the ServiceDesk Plus Cloud API.
//!
//! This module provides the `ApiClient` struct for making authenticated
//! requests to the ServiceDesk Plus v3 REST API with Zoho OAuth tokens.
//!
//! # Token Recovery
//!
//! Every call obtains a token from the [`TokenManager`] first. If the remote
//! answers 401 despite the token being locally valid (clock skew, early
//! server-side expiry), the client asks the manager to replace the rejected
//! token and sends the request again, up to `max_auth_retries` times (one by
//! default). No other failure is retried.
//!
//! # Security
//!
//! Tokens and OAuth secrets are never logged. Remote bodies are sanitized
//! and truncated before they are put into errors.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;

use crate::config::{Config, Credentials};
use crate::error::GatewayError;
use crate::models::{
    extract_error_message, response_status_of, CreateRequestResponse, CreatedTicket,
    GetRequestResponse, RawRequestResponse, SdpResponse, TicketRequest, TicketSummary,
};
use crate::token_manager::TokenManager;

/// The Accept header value for SDP API v3.
const SDP_ACCEPT_HEADER: &str = "application/vnd.manageengine.sdp.v3+json";

/// Authorization scheme Zoho expects in front of access tokens.
const AUTH_SCHEME: &str = "Zoho-oauthtoken";

/// A response that made it back from SDP, successful or not.
#[derive(Debug)]
struct UpstreamResponse {
    status: StatusCode,
    body: String,
}

/// Outcome of a single send.
#[derive(Debug)]
enum Attempt {
    /// The remote answered with something other than 401.
    Completed(UpstreamResponse),
    /// The remote rejected the token.
    AuthRejected { body: String },
}

/// HTTP client for ServiceDesk Plus Cloud.
///
/// Cloning is cheap; clones share the HTTP connection pool and the token manager.
///
/// # Example
///
/// ```ignore
/// let config = Config::from_env()?;
/// let tokens = Arc::new(TokenManager::new(&config)?);
/// let client = ApiClient::new(&config, tokens)?;
///
/// let summary = client.fetch_ticket("131260000174674420").await?;
/// ```
#[derive(Clone)]
pub struct ApiClient {
    /// The underlying HTTP client (cloning is cheap).
    http: Client,

    /// Base URL for the SDP API (e.g., `https://sdpondemand.manageengine.com/app/itdesk/api/v3`).
    base_url: String,

    /// Source of access tokens.
    tokens: Arc<TokenManager>,

    /// Shared credentials, used only to scrub secrets from error messages.
    credentials: Arc<Credentials>,

    /// Request timeout, for error reporting.
    timeout: Duration,

    /// Retries allowed after the remote rejects a token.
    max_auth_retries: u32,
}

impl ApiClient {
    /// Creates a new SDP client from configuration.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::HttpClient` if the HTTP client fails to initialize.
    pub fn new(config: &Config, tokens: Arc<TokenManager>) -> Result<Self, GatewayError> {
        let http = Client::builder()
            .connect_timeout(config.request_timeout)
            .timeout(config.request_timeout)
            .build()
            .map_err(GatewayError::HttpClient)?;

        Ok(Self {
            http,
            base_url: Self::normalize_base_url(&config.credentials.api_base_url),
            tokens,
            credentials: Arc::clone(&config.credentials),
            timeout: config.request_timeout,
            max_auth_retries: config.max_auth_retries,
        })
    }

    /// Normalizes the base URL to ensure it includes the API path.
    fn normalize_base_url(url: &str) -> String {
        let url = url.trim_end_matches('/');
        if url.ends_with("/api/v3") {
            url.to_string()
        } else if url.ends_with("/api") {
            format!("{}/v3", url)
        } else {
            format!("{}/api/v3", url)
        }
    }

    /// Trims a ticket ID and rejects empty ones.
    fn validate_id(id: &str) -> Result<String, GatewayError> {
        let id = id.trim();
        if id.is_empty() {
            return Err(GatewayError::validation("ticket_id must not be empty"));
        }
        Ok(id.to_string())
    }

    /// Creates a ticket and returns its SDP request ID.
    ///
    /// # Errors
    ///
    /// - `GatewayError::Authentication` if no token could be obtained
    /// - `GatewayError::Upstream` for any non-2xx answer (including a second
    ///   401), a failed `response_status`, or a response without an ID
    pub async fn create_ticket(&self, ticket: &TicketRequest) -> Result<CreatedTicket, GatewayError> {
        let response = self
            .execute(Method::POST, "/requests", Some(ticket.to_envelope()))
            .await?;

        if !response.status.is_success() {
            return Err(self.status_error(&response));
        }

        let status = response.status;
        let created: CreateRequestResponse = Self::parse(&response)?;
        let ticket_id = created
            .request
            .and_then(|r| r.id)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| {
                GatewayError::upstream(status, "response did not contain a request id")
            })?;

        tracing::info!(ticket_id = %ticket_id, "Ticket created");
        Ok(CreatedTicket { ticket_id })
    }

    /// Fetches a ticket and projects it into a [`TicketSummary`].
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::NotFound` if SDP reports the ticket missing,
    /// `GatewayError::Upstream` for other non-2xx answers.
    pub async fn fetch_ticket(&self, ticket_id: &str) -> Result<TicketSummary, GatewayError> {
        let response: GetRequestResponse = self.fetch_request(ticket_id).await?;
        Ok(response.request.summary())
    }

    /// Fetches a ticket and returns the remote request object unchanged.
    pub async fn fetch_ticket_raw(
        &self,
        ticket_id: &str,
    ) -> Result<serde_json::Value, GatewayError> {
        let response: RawRequestResponse = self.fetch_request(ticket_id).await?;
        Ok(response.request)
    }

    /// `GET /requests/{id}`, with a 404 or an SDP "not found" status mapped
    /// to `NotFound`.
    async fn fetch_request<T>(&self, ticket_id: &str) -> Result<T, GatewayError>
    where
        T: DeserializeOwned,
    {
        let id = Self::validate_id(ticket_id)?;
        let path = format!("/requests/{}", urlencoding::encode(&id));

        let response = self.execute(Method::GET, &path, None).await?;

        if response.status == StatusCode::NOT_FOUND {
            return Err(GatewayError::not_found(id));
        }
        if !response.status.is_success() {
            return Err(self.status_error(&response));
        }

        if response_status_of(&response.body).is_some_and(|s| s.is_not_found()) {
            return Err(GatewayError::not_found(id));
        }

        Self::parse(&response)
    }

    /// Parses a successful SDP body and checks its `response_status`.
    fn parse<T>(response: &UpstreamResponse) -> Result<T, GatewayError>
    where
        T: DeserializeOwned,
    {
        let sdp_response: SdpResponse<T> =
            serde_json::from_str(&response.body).map_err(GatewayError::Serialization)?;
        sdp_response.into_result(response.status)
    }

    /// Builds an `Upstream` error from a non-success response.
    fn status_error(&self, response: &UpstreamResponse) -> GatewayError {
        let message = extract_error_message(&response.body);
        GatewayError::upstream(
            response.status,
            GatewayError::sanitize_body(&message, &self.credentials.secrets()),
        )
    }

    /// Sends a request with a valid token, replacing the token and resending
    /// when the remote rejects it.
    ///
    /// Only 401 is retried, at most `max_auth_retries` times. Any other
    /// status is returned to the caller as-is.
    async fn execute(
        &self,
        method: Method,
        path: &str,
        input_data: Option<serde_json::Value>,
    ) -> Result<UpstreamResponse, GatewayError> {
        let input_json = input_data
            .map(|data| serde_json::to_string(&data))
            .transpose()
            .map_err(GatewayError::Serialization)?;

        let mut token = self.tokens.get_valid_token().await?;
        let mut auth_retries = 0u32;

        loop {
            match self
                .send_once(&method, path, input_json.as_deref(), &token)
                .await?
            {
                Attempt::Completed(response) => return Ok(response),
                Attempt::AuthRejected { .. } if auth_retries < self.max_auth_retries => {
                    auth_retries += 1;
                    tracing::info!(
                        method = %method,
                        path = %path,
                        attempt = auth_retries,
                        max_attempts = self.max_auth_retries,
                        "Access token rejected, refreshing and retrying"
                    );
                    token = self.tokens.refresh_rejected(&token).await?;
                }
                Attempt::AuthRejected { body } => {
                    tracing::warn!(
                        method = %method,
                        path = %path,
                        "Access token rejected after refresh, giving up"
                    );
                    let message = extract_error_message(&body);
                    return Err(GatewayError::upstream(
                        StatusCode::UNAUTHORIZED,
                        self.sanitize_with_token(&message, &token),
                    ));
                }
            }
        }
    }

    /// Makes a single request to the SDP API.
    ///
    /// `input_data`, when present, is sent as the `input_data` form field.
    async fn send_once(
        &self,
        method: &Method,
        path: &str,
        input_data: Option<&str>,
        token: &str,
    ) -> Result<Attempt, GatewayError> {
        let url = format!("{}{}", self.base_url, path);
        let operation = format!("{} {}", method, path);

        tracing::debug!(
            method = %method,
            path = %path,
            "Making SDP API request"
        );

        let mut req = self
            .http
            .request(method.clone(), &url)
            .header("Authorization", format!("{} {}", AUTH_SCHEME, token))
            .header("Accept", SDP_ACCEPT_HEADER);

        if let Some(input_json) = input_data {
            req = req
                .header("Content-Type", "application/x-www-form-urlencoded")
                .body(format!("input_data={}", urlencoding::encode(input_json)));
        }

        let response = req
            .send()
            .await
            .map_err(|e| GatewayError::from_transport(e, self.timeout, &operation))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| GatewayError::from_transport(e, self.timeout, &operation))?;

        tracing::trace!(status = %status, "SDP API response received");

        if status == StatusCode::UNAUTHORIZED {
            return Ok(Attempt::AuthRejected { body });
        }

        Ok(Attempt::Completed(UpstreamResponse { status, body }))
    }

    /// Sanitizes a message against the OAuth secrets and the current token.
    fn sanitize_with_token(&self, message: &str, token: &str) -> String {
        let [secret, refresh] = self.credentials.secrets();
        GatewayError::sanitize_body(message, &[secret, refresh, token])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Credentials;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(server_uri: &str) -> Config {
        Config::with_credentials(Credentials {
            client_id: "1000.CLIENT".to_string(),
            client_secret: "client-secret-value".to_string(),
            refresh_token: "1000.refresh-token-value".to_string(),
            accounts_base_url: server_uri.to_string(),
            api_base_url: format!("{}/app/itdesk", server_uri),
        })
    }

    fn test_client(config: &Config) -> ApiClient {
        let tokens = Arc::new(TokenManager::new(config).unwrap());
        ApiClient::new(config, tokens).unwrap()
    }

    fn token_response(token: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({
            "access_token": token,
            "expires_in": 3600,
            "token_type": "Bearer"
        }))
    }

    /// Token endpoint that hands out `tok-1` first and `tok-2` afterwards.
    async fn mount_rotating_tokens(server: &MockServer, expected_calls: u64) {
        Mock::given(method("POST"))
            .and(path("/oauth/v2/token"))
            .respond_with(token_response("tok-1"))
            .up_to_n_times(1)
            .mount(server)
            .await;
        Mock::given(method("POST"))
            .and(path("/oauth/v2/token"))
            .respond_with(token_response("tok-2"))
            .expect(expected_calls.saturating_sub(1))
            .mount(server)
            .await;
    }

    fn ticket() -> TicketRequest {
        TicketRequest {
            subject: "X".into(),
            description: "Y".into(),
            requester_email: "a@b.com".into(),
            template: Some(json!({"name": "T"})),
            ..Default::default()
        }
    }

    const TICKET_PATH: &str = "/app/itdesk/api/v3/requests";

    #[test]
    fn test_normalize_base_url() {
        assert_eq!(
            ApiClient::normalize_base_url("https://example.com/app/itdesk"),
            "https://example.com/app/itdesk/api/v3"
        );
        assert_eq!(
            ApiClient::normalize_base_url("https://example.com/"),
            "https://example.com/api/v3"
        );
        assert_eq!(
            ApiClient::normalize_base_url("https://example.com/api/v3/"),
            "https://example.com/api/v3"
        );
        assert_eq!(
            ApiClient::normalize_base_url("https://example.com/api"),
            "https://example.com/api/v3"
        );
    }

    #[test]
    fn test_validate_id() {
        assert_eq!(ApiClient::validate_id(" 123 ").unwrap(), "123");
        assert!(ApiClient::validate_id("   ").is_err());
    }

    #[tokio::test]
    async fn test_create_ticket_returns_id() {
        let server = MockServer::start().await;
        mount_rotating_tokens(&server, 1).await;
        Mock::given(method("POST"))
            .and(path(TICKET_PATH))
            .and(header("Authorization", "Zoho-oauthtoken tok-1"))
            .and(header("Accept", SDP_ACCEPT_HEADER))
            .and(body_string_contains("input_data="))
            .and(body_string_contains("%22subject%22%3A%22X%22"))
            .and(body_string_contains("%22email_id%22%3A%22a%40b.com%22"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "request": {"id": "999"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&test_config(&server.uri()));
        let created = client.create_ticket(&ticket()).await.unwrap();
        assert_eq!(
            created,
            CreatedTicket {
                ticket_id: "999".into()
            }
        );
    }

    #[tokio::test]
    async fn test_create_ticket_accepts_numeric_id_and_status_block() {
        let server = MockServer::start().await;
        mount_rotating_tokens(&server, 1).await;
        Mock::given(method("POST"))
            .and(path(TICKET_PATH))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "response_status": {"status_code": 2000, "status": "success"},
                "request": {"id": 131260000174674420u64, "subject": "X"}
            })))
            .mount(&server)
            .await;

        let client = test_client(&test_config(&server.uri()));
        let created = client.create_ticket(&ticket()).await.unwrap();
        assert_eq!(created.ticket_id, "131260000174674420");
    }

    #[tokio::test]
    async fn test_create_ticket_recovers_from_one_401() {
        let server = MockServer::start().await;
        mount_rotating_tokens(&server, 2).await;
        Mock::given(method("POST"))
            .and(path(TICKET_PATH))
            .and(header("Authorization", "Zoho-oauthtoken tok-1"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "response_status": {"status_code": 4001, "status": "failed",
                    "messages": [{"message": "Token expired"}]}
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(TICKET_PATH))
            .and(header("Authorization", "Zoho-oauthtoken tok-2"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "request": {"id": "1000"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&test_config(&server.uri()));
        let created = client.create_ticket(&ticket()).await.unwrap();
        assert_eq!(created.ticket_id, "1000");
    }

    #[tokio::test]
    async fn test_second_401_surfaces_as_upstream_error() {
        let server = MockServer::start().await;
        mount_rotating_tokens(&server, 2).await;
        Mock::given(method("POST"))
            .and(path(TICKET_PATH))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "response_status": {"status_code": 4001, "status": "failed",
                    "messages": [{"message": "Invalid OAuth token"}]}
            })))
            .expect(2)
            .mount(&server)
            .await;

        let client = test_client(&test_config(&server.uri()));
        let err = client.create_ticket(&ticket()).await.unwrap_err();
        match err {
            GatewayError::Upstream { status, body } => {
                assert_eq!(status, StatusCode::UNAUTHORIZED);
                assert_eq!(body, "Invalid OAuth token");
            }
            other => panic!("expected Upstream, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_zero_auth_retries_does_not_refresh() {
        let server = MockServer::start().await;
        mount_rotating_tokens(&server, 1).await;
        Mock::given(method("GET"))
            .and(path(format!("{}/5", TICKET_PATH)))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;

        let mut config = test_config(&server.uri());
        config.max_auth_retries = 0;
        let client = test_client(&config);
        let err = client.fetch_ticket("5").await.unwrap_err();
        assert_eq!(err.upstream_status(), Some(StatusCode::UNAUTHORIZED));
    }

    #[tokio::test]
    async fn test_create_ticket_upstream_error_message() {
        let server = MockServer::start().await;
        mount_rotating_tokens(&server, 1).await;
        Mock::given(method("POST"))
            .and(path(TICKET_PATH))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "response_status": {"status_code": 4000, "status": "failed",
                    "messages": [{"message": "Template is invalid", "status_code": 4001}]}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&test_config(&server.uri()));
        let err = client.create_ticket(&ticket()).await.unwrap_err();
        assert_eq!(err.upstream_status(), Some(StatusCode::BAD_REQUEST));
        assert!(err.to_string().contains("Template is invalid"));
    }

    #[tokio::test]
    async fn test_create_ticket_without_id_is_upstream_error() {
        let server = MockServer::start().await;
        mount_rotating_tokens(&server, 1).await;
        Mock::given(method("POST"))
            .and(path(TICKET_PATH))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"request": {}})))
            .mount(&server)
            .await;

        let client = test_client(&test_config(&server.uri()));
        let err = client.create_ticket(&ticket()).await.unwrap_err();
        assert!(matches!(err, GatewayError::Upstream { .. }));
    }

    #[tokio::test]
    async fn test_create_ticket_failed_response_status() {
        let server = MockServer::start().await;
        mount_rotating_tokens(&server, 1).await;
        Mock::given(method("POST"))
            .and(path(TICKET_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "response_status": {"status_code": 4000, "status": "failed",
                    "messages": [{"message": "Requester not found"}]}
            })))
            .mount(&server)
            .await;

        let client = test_client(&test_config(&server.uri()));
        let err = client.create_ticket(&ticket()).await.unwrap_err();
        assert!(err.to_string().contains("Requester not found"));
    }

    #[tokio::test]
    async fn test_create_ticket_not_found_code_is_upstream() {
        let server = MockServer::start().await;
        mount_rotating_tokens(&server, 1).await;
        Mock::given(method("POST"))
            .and(path(TICKET_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "response_status": {"status_code": 4005, "status": "failed",
                    "messages": [{"message": "Invalid template"}]}
            })))
            .mount(&server)
            .await;

        let client = test_client(&test_config(&server.uri()));
        let err = client.create_ticket(&ticket()).await.unwrap_err();
        match err {
            GatewayError::Upstream { status, body } => {
                assert_eq!(status, StatusCode::OK);
                assert_eq!(body, "SDP error 4005: Invalid template");
            }
            other => panic!("expected Upstream, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_401_then_failed_refresh_is_authentication_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth/v2/token"))
            .respond_with(token_response("tok-1"))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/oauth/v2/token"))
            .respond_with(ResponseTemplate::new(500).set_body_string("accounts down"))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(TICKET_PATH))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&test_config(&server.uri()));
        let err = client.create_ticket(&ticket()).await.unwrap_err();
        assert!(matches!(
            err,
            GatewayError::Authentication { status: Some(s), .. } if s == StatusCode::INTERNAL_SERVER_ERROR
        ));
    }

    #[tokio::test]
    async fn test_token_failure_skips_outbound_call() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth/v2/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({"error": "invalid_client"})))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(TICKET_PATH))
            .respond_with(ResponseTemplate::new(201))
            .expect(0)
            .mount(&server)
            .await;

        let client = test_client(&test_config(&server.uri()));
        let err = client.create_ticket(&ticket()).await.unwrap_err();
        assert!(matches!(err, GatewayError::Authentication { .. }));
    }

    #[tokio::test]
    async fn test_fetch_ticket_without_technician() {
        let server = MockServer::start().await;
        mount_rotating_tokens(&server, 1).await;
        Mock::given(method("GET"))
            .and(path(format!("{}/131260000174674420", TICKET_PATH)))
            .and(header("Authorization", "Zoho-oauthtoken tok-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "request": {
                    "id": "131260000174674420",
                    "subject": "Laptop",
                    "status": {"name": "Open", "id": "2"}
                },
                "response_status": {"status_code": 2000, "status": "success"}
            })))
            .mount(&server)
            .await;

        let client = test_client(&test_config(&server.uri()));
        let summary = client.fetch_ticket("131260000174674420").await.unwrap();
        assert_eq!(
            summary,
            TicketSummary {
                ticket_id: "131260000174674420".into(),
                status: "Open".into(),
                technician_assigned: "Unassigned".into(),
                technician_contact_email: None,
                technician_comments: None,
            }
        );
    }

    #[tokio::test]
    async fn test_fetch_ticket_is_idempotent() {
        let server = MockServer::start().await;
        mount_rotating_tokens(&server, 1).await;
        Mock::given(method("GET"))
            .and(path(format!("{}/7", TICKET_PATH)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "request": {
                    "id": 7,
                    "status": {"name": "In Progress"},
                    "technician": {"name": "Ada", "email_id": "ada@example.com"},
                    "resolution": {"content": "Working on it"}
                }
            })))
            .expect(2)
            .mount(&server)
            .await;

        let client = test_client(&test_config(&server.uri()));
        let first = client.fetch_ticket("7").await.unwrap();
        let second = client.fetch_ticket("7").await.unwrap();
        assert_eq!(
            serde_json::to_vec(&first).unwrap(),
            serde_json::to_vec(&second).unwrap()
        );
        assert_eq!(first.technician_assigned, "Ada");
    }

    #[tokio::test]
    async fn test_fetch_ticket_recovers_from_one_401() {
        let server = MockServer::start().await;
        mount_rotating_tokens(&server, 2).await;
        Mock::given(method("GET"))
            .and(path(format!("{}/8", TICKET_PATH)))
            .and(header("Authorization", "Zoho-oauthtoken tok-1"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("{}/8", TICKET_PATH)))
            .and(header("Authorization", "Zoho-oauthtoken tok-2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "request": {"id": "8", "status": {"name": "Closed"}}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&test_config(&server.uri()));
        assert_eq!(client.fetch_ticket("8").await.unwrap().status, "Closed");
    }

    #[tokio::test]
    async fn test_fetch_ticket_not_found() {
        let server = MockServer::start().await;
        mount_rotating_tokens(&server, 1).await;
        Mock::given(method("GET"))
            .and(path(format!("{}/404404", TICKET_PATH)))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = test_client(&test_config(&server.uri()));
        let err = client.fetch_ticket("404404").await.unwrap_err();
        assert!(matches!(err, GatewayError::NotFound { ref id } if id == "404404"));
    }

    #[tokio::test]
    async fn test_fetch_ticket_not_found_status_code() {
        let server = MockServer::start().await;
        mount_rotating_tokens(&server, 1).await;
        Mock::given(method("GET"))
            .and(path(format!("{}/13", TICKET_PATH)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "response_status": {"status_code": 4005, "status": "failed",
                    "messages": [{"message": "Request not found"}]}
            })))
            .mount(&server)
            .await;

        let client = test_client(&test_config(&server.uri()));
        let err = client.fetch_ticket("13").await.unwrap_err();
        assert!(matches!(err, GatewayError::NotFound { ref id } if id == "13"));
    }

    #[tokio::test]
    async fn test_fetch_ticket_server_error() {
        let server = MockServer::start().await;
        mount_rotating_tokens(&server, 1).await;
        Mock::given(method("GET"))
            .and(path(format!("{}/9", TICKET_PATH)))
            .respond_with(ResponseTemplate::new(500).set_body_string("internal failure"))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&test_config(&server.uri()));
        let err = client.fetch_ticket("9").await.unwrap_err();
        match err {
            GatewayError::Upstream { status, body } => {
                assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
                assert_eq!(body, "internal failure");
            }
            other => panic!("expected Upstream, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_fetch_ticket_encodes_id() {
        let server = MockServer::start().await;
        mount_rotating_tokens(&server, 1).await;
        Mock::given(method("GET"))
            .and(path(format!("{}/12%2F34", TICKET_PATH)))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&test_config(&server.uri()));
        assert!(client.fetch_ticket("12/34").await.is_err());
    }

    #[tokio::test]
    async fn test_fetch_ticket_rejects_blank_id_before_any_call() {
        let server = MockServer::start().await;
        mount_rotating_tokens(&server, 0).await;

        let client = test_client(&test_config(&server.uri()));
        let err = client.fetch_ticket("  ").await.unwrap_err();
        assert!(matches!(err, GatewayError::Validation { .. }));
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_fetch_ticket_raw_passes_through() {
        let server = MockServer::start().await;
        mount_rotating_tokens(&server, 1).await;
        let remote = json!({
            "id": "11",
            "status": {"name": "Open", "id": "2"},
            "udf_fields": {"udf_sline_301": "Laptop-42"}
        });
        Mock::given(method("GET"))
            .and(path(format!("{}/11", TICKET_PATH)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"request": remote})))
            .mount(&server)
            .await;

        let client = test_client(&test_config(&server.uri()));
        assert_eq!(client.fetch_ticket_raw("11").await.unwrap(), remote);
    }

    #[tokio::test]
    async fn test_slow_upstream_times_out() {
        let server = MockServer::start().await;
        mount_rotating_tokens(&server, 1).await;
        Mock::given(method("GET"))
            .and(path(format!("{}/12", TICKET_PATH)))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"request": {"id": "12"}}))
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let mut config = test_config(&server.uri());
        config.request_timeout = Duration::from_millis(300);
        let client = test_client(&config);
        let err = client.fetch_ticket("12").await.unwrap_err();
        assert!(matches!(err, GatewayError::Timeout { .. }));
    }
}
