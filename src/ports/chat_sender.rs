//! ChatSender port - Interface for posting messages into a chat channel.
//!
//! The dispatcher only knows "send text to channel X". Connection handling,
//! authentication and reconnection belong to the adapter.

use async_trait::async_trait;
use thiserror::Error;

/// Errors a chat adapter can report.
#[derive(Debug, Error)]
pub enum ChatError {
    /// The adapter has no live connection.
    #[error("Chat client is not connected")]
    NotConnected,

    /// The chat server rejected the bot's credentials.
    #[error("Chat login rejected: {0}")]
    AuthenticationFailed(String),

    /// The chat server did not respond in time.
    #[error("Chat server timed out")]
    Timeout,

    /// Channel name is empty or malformed.
    #[error("Invalid channel: {0}")]
    InvalidChannel(String),

    /// Transport failure while talking to the chat server.
    #[error("Chat I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Port for sending chat messages.
///
/// Implementations must ensure:
/// - One `say` call posts at most one chat message
/// - Failures are reported, not retried
///
/// # Example
///
/// ```ignore
/// sender.say("#patdoubleyou", "We've got a follow from Foo!").await?;
/// ```
#[async_trait]
pub trait ChatSender: Send + Sync {
    /// Post `message` to `channel`.
    async fn say(&self, channel: &str, message: &str) -> Result<(), ChatError>;
}
