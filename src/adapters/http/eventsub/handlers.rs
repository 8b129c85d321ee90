//! HTTP handlers for EventSub endpoints.
//!
//! These handlers connect Axum routes to the EventSub command handler.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::application::handlers::eventsub::{
    ChatRelay, HandleEventSubMessageCommand, HandleEventSubMessageHandler, HandleEventSubResult,
};
use crate::domain::eventsub::{FormatterRegistry, WebhookError};
use crate::ports::SecretProvider;

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Shared application state containing all dependencies.
///
/// Cloned for each request; every dependency is Arc-wrapped and read-only.
#[derive(Clone)]
pub struct EventSubAppState {
    pub secret_provider: Arc<dyn SecretProvider>,
    pub formatters: Arc<FormatterRegistry>,
    pub chat_relay: ChatRelay,
    /// Reject messages older than this many seconds (disabled when `None`).
    pub max_message_age_secs: Option<i64>,
}

impl EventSubAppState {
    /// Create the webhook handler from the shared state.
    pub fn eventsub_handler(&self) -> HandleEventSubMessageHandler {
        HandleEventSubMessageHandler::new(
            self.secret_provider.clone(),
            self.formatters.clone(),
            self.chat_relay.clone(),
        )
        .with_max_message_age(self.max_message_age_secs)
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Handlers
// ════════════════════════════════════════════════════════════════════════════════

/// POST /eventsub - Handle EventSub webhook deliveries
///
/// The body is taken as raw bytes; signature verification needs the exact
/// bytes that were sent.
pub async fn handle_eventsub(
    State(state): State<EventSubAppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, EventSubApiError> {
    let handler = state.eventsub_handler();
    let cmd = HandleEventSubMessageCommand {
        headers,
        payload: body,
    };

    let response = match handler.handle(cmd)? {
        HandleEventSubResult::Challenge(challenge) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            challenge,
        )
            .into_response(),
        HandleEventSubResult::Announced { .. }
        | HandleEventSubResult::Unhandled { .. }
        | HandleEventSubResult::Revoked { .. }
        | HandleEventSubResult::UnknownMessageType(_) => StatusCode::NO_CONTENT.into_response(),
    };

    Ok(response)
}

/// GET /health - Liveness probe
pub async fn health_check() -> &'static str {
    "ok"
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

/// API error type that converts webhook errors to HTTP responses.
///
/// Responses carry no body; the platform only looks at the status.
#[derive(Debug)]
pub struct EventSubApiError(WebhookError);

impl From<WebhookError> for EventSubApiError {
    fn from(err: WebhookError) -> Self {
        Self(err)
    }
}

impl IntoResponse for EventSubApiError {
    fn into_response(self) -> Response {
        if self.0.is_auth_failure() {
            tracing::warn!(error = %self.0, "Rejected webhook");
        } else {
            tracing::warn!(error = %self.0, "Unprocessable webhook");
        }
        self.0.status_code().into_response()
    }
}
