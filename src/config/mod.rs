//! Application configuration module
//!
//! Configuration is loaded from environment variables using the `config` and
//! `dotenvy` crates. Variables use the `EVENTSUB_RELAY` prefix and nested
//! values are separated by double underscores.
//!
//! # Example
//!
//! ```no_run
//! use eventsub_relay::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//!
//! println!("Server running on {:?}", config.server.socket_addr());
//! ```

mod chat;
mod error;
mod eventsub;
mod server;

pub use chat::ChatConfig;
pub use error::{ConfigError, ValidationError};
pub use eventsub::EventSubConfig;
pub use server::{Environment, ServerConfig};

use serde::Deserialize;

/// Root application configuration
///
/// Load using [`AppConfig::load()`] which reads from environment variables.
#[derive(Debug, Deserialize)]
pub struct AppConfig {
    /// Server configuration (host, port, environment)
    #[serde(default)]
    pub server: ServerConfig,

    /// Webhook configuration (signing secret, freshness window)
    pub eventsub: EventSubConfig,

    /// Chat configuration (bot account, channel)
    #[serde(default)]
    pub chat: ChatConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// This function:
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with `EVENTSUB_RELAY` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    /// 4. Deserializes into typed configuration structs
    ///
    /// # Environment Variable Format
    ///
    /// - `EVENTSUB_RELAY__SERVER__PORT=8080` -> `server.port = 8080`
    /// - `EVENTSUB_RELAY__EVENTSUB__SECRET=...` -> `eventsub.secret = ...`
    /// - `EVENTSUB_RELAY__CHAT__OAUTH_TOKEN=...` -> `chat.oauth_token = ...`
    ///
    /// A bare `PORT` variable (as set by hosting platforms) is used for
    /// `server.port` when `EVENTSUB_RELAY__SERVER__PORT` is not set.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the webhook secret is missing or a value
    /// cannot be parsed into its expected type.
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (development)
        dotenvy::dotenv().ok();

        let mut builder = config::Config::builder();
        // Platform-assigned `PORT`; the prefixed variable still wins
        if let Ok(port) = std::env::var("PORT") {
            builder = builder.set_default("server.port", port)?;
        }

        let config = builder
            .add_source(
                config::Environment::default()
                    .prefix("EVENTSUB_RELAY")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if any configuration value is invalid.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.eventsub.validate()?;
        self.chat.validate()?;
        Ok(())
    }
}
