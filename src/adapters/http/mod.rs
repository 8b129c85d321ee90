//! HTTP adapters - REST API implementations.

pub mod eventsub;

use std::time::Duration;

use axum::Router;
use tower::ServiceBuilder;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

pub use eventsub::eventsub_router;
pub use eventsub::EventSubAppState;

/// Builds the full application router with tracing and timeout layers.
pub fn build_router(state: EventSubAppState, request_timeout: Duration) -> Router {
    let trace_layer =
        TraceLayer::new_for_http().make_span_with(|request: &axum::extract::Request| {
            tracing::info_span!(
                "request",
                method = %request.method(),
                uri = %request.uri()
            )
        });

    eventsub_router().with_state(state).layer(
        ServiceBuilder::new()
            .layer(trace_layer)
            .layer(TimeoutLayer::new(request_timeout)),
    )
}
