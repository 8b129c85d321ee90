//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! - `ChatSender` - Posts a message to a chat channel
//! - `SecretProvider` - Supplies the webhook signing secret

mod chat_sender;
mod secret_provider;

pub use chat_sender::{ChatError, ChatSender};
pub use secret_provider::SecretProvider;
