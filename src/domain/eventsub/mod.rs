//! EventSub domain module.
//!
//! Authenticates webhook messages and turns verified events into chat
//! announcements.
//!
//! # Module Structure
//!
//! - `message` - Message types, header names and per-type payloads
//! - `signature` - HMAC-SHA256 signature verification
//! - `formatters` - Announcement formatters and their registry
//! - `webhook_errors` - Errors with HTTP status mapping

mod formatters;
mod message;
mod signature;
mod webhook_errors;

pub use formatters::{
    format_cheer, format_follow, format_hype_train_begin, format_raid, format_stream_offline,
    format_stream_online, format_subscribe, format_subscription_gift, EventKind, Formatter,
    FormatterRegistry, UnknownEventKind,
};
pub use message::{
    ChallengePayload, MessageType, NotificationPayload, RevocationPayload, Subscription,
    MESSAGE_ID_HEADER, MESSAGE_SIGNATURE_HEADER, MESSAGE_TIMESTAMP_HEADER, MESSAGE_TYPE_HEADER,
};
pub use signature::{compute_signature, validate_timestamp, verify, SignatureContext, HMAC_PREFIX};
pub use webhook_errors::WebhookError;
