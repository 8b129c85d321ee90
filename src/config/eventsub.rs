//! EventSub webhook configuration

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use super::error::ValidationError;

/// EventSub webhook configuration
#[derive(Debug, Deserialize)]
pub struct EventSubConfig {
    /// Shared secret registered with the subscription
    pub secret: SecretString,

    /// Reject deliveries older than this many seconds
    #[serde(default)]
    pub max_message_age_secs: Option<i64>,
}

impl EventSubConfig {
    /// Validate webhook configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        let secret = self.secret.expose_secret();
        if secret.is_empty() {
            return Err(ValidationError::MissingRequired("EVENTSUB__SECRET"));
        }
        // Platform rule for subscription secrets
        if !(10..=100).contains(&secret.len()) || !secret.is_ascii() {
            return Err(ValidationError::InvalidWebhookSecret);
        }

        if let Some(age) = self.max_message_age_secs {
            if age <= 0 {
                return Err(ValidationError::InvalidMessageAge);
            }
        }

        Ok(())
    }
}
