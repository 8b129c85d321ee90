//! Chat adapters.
//!
//! - `IrcChatClient` - Twitch chat over IRC
//! - `LoggingChatSender` - Logs announcements instead of sending them

mod irc_client;
mod logging_sender;

pub use irc_client::{IrcChatClient, IrcConnectionConfig};
pub use logging_sender::LoggingChatSender;
