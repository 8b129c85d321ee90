//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `chat` - Twitch chat over IRC, or log-only
//! - `http` - Axum webhook endpoint
//! - `secrets` - Webhook secret from configuration

pub mod chat;
pub mod http;
pub mod secrets;
