//! Chat configuration

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use super::error::ValidationError;

/// Chat configuration (Twitch IRC)
#[derive(Debug, Deserialize)]
pub struct ChatConfig {
    /// Send announcements to chat; when false they are only logged
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Bot account login
    #[serde(default = "default_username")]
    pub username: String,

    /// Chat OAuth token for the bot account
    pub oauth_token: Option<SecretString>,

    /// Channel to announce in
    #[serde(default = "default_channel")]
    pub channel: String,

    /// IRC server as `host:port`
    #[serde(default = "default_server")]
    pub server: String,
}

impl ChatConfig {
    /// Channel name lowercased with a leading `#`
    pub fn normalized_channel(&self) -> String {
        let name = self.channel.trim().trim_start_matches('#').to_lowercase();
        format!("#{}", name)
    }

    /// Validate chat configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        let channel = self.normalized_channel();
        if channel.len() < 2 || channel.contains(char::is_whitespace) {
            return Err(ValidationError::InvalidChannel(self.channel.clone()));
        }

        if !self.enabled {
            return Ok(());
        }

        let token_missing = self
            .oauth_token
            .as_ref()
            .map(|t| t.expose_secret().trim().is_empty())
            .unwrap_or(true);
        if token_missing {
            return Err(ValidationError::MissingRequired("CHAT__OAUTH_TOKEN"));
        }
        if self.username.trim().is_empty() {
            return Err(ValidationError::MissingRequired("CHAT__USERNAME"));
        }
        if self.server.trim().is_empty() {
            return Err(ValidationError::MissingRequired("CHAT__SERVER"));
        }

        Ok(())
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            username: default_username(),
            oauth_token: None,
            channel: default_channel(),
            server: default_server(),
        }
    }
}

fn default_enabled() -> bool {
    true
}

fn default_username() -> String {
    "BotDoubleYou".to_string()
}

fn default_channel() -> String {
    "#patdoubleyou".to_string()
}

fn default_server() -> String {
    "irc.chat.twitch.tv:6667".to_string()
}
