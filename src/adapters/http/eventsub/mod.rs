//! HTTP adapter for EventSub endpoints.
//!
//! Exposes the webhook pipeline via HTTP:
//! - `POST /eventsub` - Handle EventSub webhook deliveries
//! - `GET /health` - Liveness probe

mod handlers;
mod routes;

pub use handlers::{handle_eventsub, health_check, EventSubApiError, EventSubAppState};
pub use routes::{eventsub_router, eventsub_routes};
