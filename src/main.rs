//! EventSub Relay - Main Entry Point
//!
//! Receives Twitch EventSub webhooks and announces them in chat.

use std::process::ExitCode;
use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use eventsub_relay::adapters::chat::{IrcChatClient, IrcConnectionConfig, LoggingChatSender};
use eventsub_relay::adapters::http::{build_router, EventSubAppState};
use eventsub_relay::adapters::secrets::ConfigSecretProvider;
use eventsub_relay::application::ChatRelay;
use eventsub_relay::config::{AppConfig, ChatConfig, ConfigError, ServerConfig, ValidationError};
use eventsub_relay::domain::eventsub::FormatterRegistry;
use eventsub_relay::ports::{ChatError, ChatSender};

/// Errors that stop the process before it starts serving.
#[derive(Debug, Error)]
enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Chat connection failed: {0}")]
    Chat(#[from] ChatError),

    #[error("Server error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ValidationError> for StartupError {
    fn from(err: ValidationError) -> Self {
        Self::Config(ConfigError::ValidationFailed(err))
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    init_tracing(&config.server);

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Startup failed");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(server: &ServerConfig) {
    use tracing_subscriber::EnvFilter;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&server.log_level));

    if server.is_production() {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .pretty()
            .init();
    }
}

async fn run(config: AppConfig) -> Result<(), StartupError> {
    config.validate()?;

    let AppConfig {
        server,
        eventsub,
        chat,
    } = config;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        environment = ?server.environment,
        "Starting EventSub relay"
    );

    let channel = chat.normalized_channel();
    let chat_sender = build_chat_sender(chat).await?;

    let state = EventSubAppState {
        secret_provider: Arc::new(ConfigSecretProvider::new(eventsub.secret)),
        formatters: Arc::new(FormatterRegistry::with_defaults()),
        chat_relay: ChatRelay::new(chat_sender, channel),
        max_message_age_secs: eventsub.max_message_age_secs,
    };

    let app = build_router(state, server.request_timeout());

    let addr = server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(address = %addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

async fn build_chat_sender(chat: ChatConfig) -> Result<Arc<dyn ChatSender>, StartupError> {
    if !chat.enabled {
        info!("Chat disabled by configuration, announcements will only be logged");
        return Ok(Arc::new(LoggingChatSender::new()));
    }

    let channel = chat.normalized_channel();
    let oauth_token = chat
        .oauth_token
        .ok_or(ValidationError::MissingRequired("CHAT__OAUTH_TOKEN"))?;

    let client = IrcChatClient::new(IrcConnectionConfig {
        server: chat.server,
        username: chat.username,
        oauth_token,
        channel,
    });
    client.connect().await?;

    Ok(Arc::new(client))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Received shutdown signal, cleaning up...");
}
