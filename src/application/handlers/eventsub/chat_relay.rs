//! ChatRelay - Fire-and-forget delivery of announcements to chat.
//!
//! Each announcement is sent on its own task so a slow or failing chat
//! connection never holds up the webhook response. Failures are logged and
//! dropped.

use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::ports::ChatSender;

/// Sends announcements to a single chat channel.
#[derive(Clone)]
pub struct ChatRelay {
    sender: Arc<dyn ChatSender>,
    channel: Arc<str>,
}

impl ChatRelay {
    pub fn new(sender: Arc<dyn ChatSender>, channel: impl Into<String>) -> Self {
        Self {
            sender,
            channel: Arc::from(channel.into()),
        }
    }

    /// Target channel for every announcement.
    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Spawns delivery of `message` and returns immediately.
    ///
    /// Must be called from within a tokio runtime. The returned handle can be
    /// awaited, but callers in the request path should not.
    pub fn relay(&self, message: String) -> JoinHandle<()> {
        let sender = Arc::clone(&self.sender);
        let channel = Arc::clone(&self.channel);

        tokio::spawn(async move {
            match sender.say(&channel, &message).await {
                Ok(()) => tracing::debug!(channel = %channel, "Relayed chat message"),
                Err(e) => tracing::error!(
                    channel = %channel,
                    error = %e,
                    "Failed to relay chat message"
                ),
            }
        })
    }
}
