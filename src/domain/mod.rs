//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `eventsub` - Webhook messages, signature verification and announcement formatting

pub mod eventsub;
