//! EventSub handlers.
//!
//! ## Commands
//! - Handling a webhook delivery (verify, classify, announce)
//!
//! ## Support
//! - `ChatRelay` - fire-and-forget delivery of announcements

mod chat_relay;
mod handle_eventsub_message;

pub use chat_relay::ChatRelay;
pub use handle_eventsub_message::{
    HandleEventSubMessageCommand, HandleEventSubMessageHandler, HandleEventSubResult,
};
