//! Chat sender that only logs.
//!
//! Used when chat is disabled, so announcements can be checked in the logs
//! without a bot account.

use async_trait::async_trait;

use crate::ports::{ChatError, ChatSender};

#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingChatSender;

impl LoggingChatSender {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ChatSender for LoggingChatSender {
    async fn say(&self, channel: &str, message: &str) -> Result<(), ChatError> {
        tracing::info!(channel = %channel, message = %message, "Chat disabled, not sending");
        Ok(())
    }
}
