//! HTTP front door for the gateway.
//!
//! This module wires the axum router: one route per operation, all sharing an
//! [`AppState`]. Handlers translate between inbound JSON and the
//! [`ApiClient`]; every failure is a [`GatewayError`], which renders itself
//! as a JSON error body with the matching status.
//!
//! # Routes
//!
//! | Route | Handler |
//! |---|---|
//! | `GET /health` | [`health`] |
//! | `POST /create_ticket` | [`create_ticket`] |
//! | `GET /get_ticket/{ticket_id}` | [`get_ticket`] |

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tower_http::trace::TraceLayer;

use crate::api_client::ApiClient;
use crate::config::TicketView;
use crate::error::GatewayError;
use crate::inputs::CreateTicketInput;
use crate::token_manager::TokenManager;

/// Message returned with every successfully created ticket.
const CREATED_MESSAGE: &str = "Ticket created successfully in Zoho Service Desk";

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Client for the ticketing API.
    pub client: ApiClient,
    /// Token manager, read by the health check.
    pub tokens: Arc<TokenManager>,
    /// What `GET /get_ticket` returns.
    pub ticket_view: TicketView,
}

/// Builds the Axum router with all routes and shared state.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/create_ticket", post(create_ticket))
        .route("/get_ticket/{ticket_id}", get(get_ticket))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Always `"healthy"` while the process serves requests.
    pub status: &'static str,
    /// Time of the check.
    pub timestamp: DateTime<Utc>,
    /// Crate version.
    pub version: &'static str,
    /// Whether a usable access token is cached.
    pub token_valid: bool,
    /// When the cached token stops being usable.
    pub token_expires_at: Option<DateTime<Utc>>,
}

/// Response for a created ticket.
#[derive(Debug, Serialize)]
pub struct CreateTicketResponse {
    /// Human-readable confirmation.
    pub message: &'static str,
    /// ID of the new ticket.
    pub ticket_id: String,
}

/// `GET /health`. Reports token state without refreshing it.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let token = state.tokens.status().await;
    tracing::debug!(token_valid = token.valid, "Health check");
    Json(HealthResponse {
        status: "healthy",
        timestamp: Utc::now(),
        version: env!("CARGO_PKG_VERSION"),
        token_valid: token.valid,
        token_expires_at: token.expires_at,
    })
}

/// `POST /create_ticket`.
pub async fn create_ticket(
    State(state): State<AppState>,
    body: Result<Json<CreateTicketInput>, JsonRejection>,
) -> Result<(StatusCode, Json<CreateTicketResponse>), GatewayError> {
    let Json(input) = body.map_err(rejection_to_error)?;
    let ticket = input.validate()?;
    tracing::debug!(subject = %ticket.subject, "create_ticket called");

    let created = state.client.create_ticket(&ticket).await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateTicketResponse {
            message: CREATED_MESSAGE,
            ticket_id: created.ticket_id,
        }),
    ))
}

/// `GET /get_ticket/{ticket_id}`.
pub async fn get_ticket(
    State(state): State<AppState>,
    Path(ticket_id): Path<String>,
) -> Result<Response, GatewayError> {
    tracing::debug!(ticket_id = %ticket_id, view = ?state.ticket_view, "get_ticket called");

    match state.ticket_view {
        TicketView::Summary => {
            let summary = state.client.fetch_ticket(&ticket_id).await?;
            Ok(Json(summary).into_response())
        }
        TicketView::Full => {
            let raw = state.client.fetch_ticket_raw(&ticket_id).await?;
            Ok(Json(raw).into_response())
        }
    }
}

/// Turns a body rejection into a validation error.
fn rejection_to_error(rejection: JsonRejection) -> GatewayError {
    match rejection {
        JsonRejection::MissingJsonContentType(_) => {
            GatewayError::validation("No JSON data provided")
        }
        other => GatewayError::validation(other.body_text()),
    }
}
