//! EventSub Relay - Twitch EventSub webhook receiver
//!
//! This crate authenticates EventSub webhook deliveries, answers verification
//! challenges, and announces notifications in a Twitch chat channel.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
