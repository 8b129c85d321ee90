//! Route configuration for EventSub endpoints.

use axum::routing::{get, post};
use axum::Router;

use super::handlers::{handle_eventsub, health_check, EventSubAppState};

/// Creates the EventSub webhook routes.
///
/// Routes:
/// - `POST /eventsub` - Webhook callback (also reachable with a trailing slash)
pub fn eventsub_routes() -> Router<EventSubAppState> {
    Router::new()
        .route("/eventsub", post(handle_eventsub))
        .route("/eventsub/", post(handle_eventsub))
}

/// Create the complete EventSub module router.
///
/// Adds `GET /health` to the webhook routes.
///
/// # Example
///
/// ```ignore
/// let app = eventsub_router().with_state(app_state);
/// ```
pub fn eventsub_router() -> Router<EventSubAppState> {
    eventsub_routes().route("/health", get(health_check))
}
