//! Chat announcements for EventSub events.
//!
//! Each known subscription type has a pure formatter that turns the event
//! payload into a chat message. Formatters are kept in a [`FormatterRegistry`]
//! keyed by subscription type, so new kinds are added by registration rather
//! than by editing the dispatcher.
//!
//! Field access is total and per field: an absent, null or mistyped field
//! renders as an empty string (flags as `false`) without affecting the other
//! fields, and never as an error.

use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Pure function from event payload to chat message.
pub type Formatter = fn(&Value) -> String;

/// Base URL of broadcaster profile pages.
const PROFILE_BASE_URL: &str = "https://www.twitch.tv/";

/// Subscription types that have a built-in announcement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    StreamOnline,
    StreamOffline,
    ChannelFollow,
    ChannelRaid,
    ChannelCheer,
    ChannelSubscribe,
    ChannelSubscriptionGift,
    HypeTrainBegin,
}

impl EventKind {
    /// Every built-in kind, in registration order.
    pub const ALL: [EventKind; 8] = [
        Self::StreamOnline,
        Self::StreamOffline,
        Self::ChannelFollow,
        Self::ChannelRaid,
        Self::ChannelCheer,
        Self::ChannelSubscribe,
        Self::ChannelSubscriptionGift,
        Self::HypeTrainBegin,
    ];

    /// Convert to the subscription type string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StreamOnline => "stream.online",
            Self::StreamOffline => "stream.offline",
            Self::ChannelFollow => "channel.follow",
            Self::ChannelRaid => "channel.raid",
            Self::ChannelCheer => "channel.cheer",
            Self::ChannelSubscribe => "channel.subscribe",
            Self::ChannelSubscriptionGift => "channel.subscription.gift",
            Self::HypeTrainBegin => "channel.hype_train.begin",
        }
    }

    /// The built-in formatter for this kind.
    pub fn formatter(&self) -> Formatter {
        match self {
            Self::StreamOnline => format_stream_online,
            Self::StreamOffline => format_stream_offline,
            Self::ChannelFollow => format_follow,
            Self::ChannelRaid => format_raid,
            Self::ChannelCheer => format_cheer,
            Self::ChannelSubscribe => format_subscribe,
            Self::ChannelSubscriptionGift => format_subscription_gift,
            Self::HypeTrainBegin => format_hype_train_begin,
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EventKind {
    type Err = UnknownEventKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| UnknownEventKind(s.to_string()))
    }
}

/// Subscription type with no built-in announcement.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("No built-in announcement for subscription type: {0}")]
pub struct UnknownEventKind(pub String);

// ════════════════════════════════════════════════════════════════════════════════
// Registry
// ════════════════════════════════════════════════════════════════════════════════

/// Mapping from subscription type to formatter.
///
/// Holds at most one formatter per subscription type.
#[derive(Clone)]
pub struct FormatterRegistry {
    formatters: HashMap<String, Formatter>,
}

impl FormatterRegistry {
    /// Creates an empty registry.
    pub fn empty() -> Self {
        Self {
            formatters: HashMap::new(),
        }
    }

    /// Creates a registry holding the built-in formatter for every [`EventKind`].
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        for kind in EventKind::ALL {
            registry.register(kind.as_str(), kind.formatter());
        }
        registry
    }

    /// Registers a formatter, returning the one it replaced (if any).
    pub fn register(
        &mut self,
        subscription_type: impl Into<String>,
        formatter: Formatter,
    ) -> Option<Formatter> {
        self.formatters.insert(subscription_type.into(), formatter)
    }

    /// Looks up the formatter for a subscription type.
    pub fn get(&self, subscription_type: &str) -> Option<Formatter> {
        self.formatters.get(subscription_type).copied()
    }

    /// Formats an event, or returns `None` when the type is unhandled.
    pub fn format(&self, subscription_type: &str, event: &Value) -> Option<String> {
        self.get(subscription_type).map(|formatter| formatter(event))
    }

    pub fn contains(&self, subscription_type: &str) -> bool {
        self.formatters.contains_key(subscription_type)
    }

    pub fn len(&self) -> usize {
        self.formatters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.formatters.is_empty()
    }
}

impl std::fmt::Debug for FormatterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut kinds: Vec<&str> = self.formatters.keys().map(String::as_str).collect();
        kinds.sort_unstable();
        f.debug_struct("FormatterRegistry")
            .field("kinds", &kinds)
            .finish()
    }
}

impl Default for FormatterRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Event payloads
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct BroadcasterEvent {
    #[serde(deserialize_with = "lenient")]
    broadcaster_user_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FollowEvent {
    #[serde(deserialize_with = "lenient")]
    user_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RaidEvent {
    #[serde(deserialize_with = "lenient")]
    from_broadcaster_user_name: Option<String>,
    #[serde(deserialize_with = "lenient")]
    viewers: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CheerEvent {
    /// Null for anonymous cheers.
    #[serde(deserialize_with = "lenient")]
    user_name: Option<String>,
    #[serde(deserialize_with = "lenient")]
    bits: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SubscribeEvent {
    #[serde(deserialize_with = "lenient")]
    user_name: Option<String>,
    #[serde(deserialize_with = "lenient")]
    is_gift: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SubscriptionGiftEvent {
    /// Null for anonymous gifts.
    #[serde(deserialize_with = "lenient")]
    user_name: Option<String>,
    #[serde(deserialize_with = "lenient")]
    total: Option<u64>,
}

/// Decodes an event payload; a payload that is not an object has all fields absent.
fn decode<T: DeserializeOwned + Default>(event: &Value) -> T {
    T::deserialize(event).unwrap_or_default()
}

/// Reads one field, turning a value of the wrong type into `None`.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

fn text(field: &Option<String>) -> &str {
    field.as_deref().unwrap_or_default()
}

fn count(field: Option<u64>) -> String {
    field.map(|n| n.to_string()).unwrap_or_default()
}

// ════════════════════════════════════════════════════════════════════════════════
// Formatters
// ════════════════════════════════════════════════════════════════════════════════

pub fn format_stream_online(event: &Value) -> String {
    let event: BroadcasterEvent = decode(event);
    format!(
        "We're starting a stream! Woo! {}!",
        text(&event.broadcaster_user_name)
    )
}

pub fn format_stream_offline(event: &Value) -> String {
    let event: BroadcasterEvent = decode(event);
    format!(
        "What a great stream! Now turn off OBS, {}! LUL",
        text(&event.broadcaster_user_name)
    )
}

pub fn format_follow(event: &Value) -> String {
    let event: FollowEvent = decode(event);
    format!("We've got a follow from {}!", text(&event.user_name))
}

pub fn format_raid(event: &Value) -> String {
    let event: RaidEvent = decode(event);
    let raider = text(&event.from_broadcaster_user_name);
    format!(
        "We're getting a raid! {raider} is joining us with {} viewers! \
         Check them out at {PROFILE_BASE_URL}{raider} and drop a follow!",
        count(event.viewers)
    )
}

pub fn format_cheer(event: &Value) -> String {
    let event: CheerEvent = decode(event);
    format!(
        "Cheering! Woo! {} bits from {}!",
        count(event.bits),
        text(&event.user_name)
    )
}

pub fn format_subscribe(event: &Value) -> String {
    let event: SubscribeEvent = decode(event);
    let name = text(&event.user_name);
    if event.is_gift.unwrap_or(false) {
        format!("{name} has just been gifted a subscription!")
    } else {
        format!("{name} has just subscribed to the channel!")
    }
}

pub fn format_subscription_gift(event: &Value) -> String {
    let event: SubscriptionGiftEvent = decode(event);
    let name = text(&event.user_name);
    if event.total == Some(1) {
        format!("{name} has just gifted a subscription to the channel!")
    } else {
        format!(
            "{name} has just gifted {} subs to the channel!",
            count(event.total)
        )
    }
}

pub fn format_hype_train_begin(_event: &Value) -> String {
    "PogChamp HYPE TRAIN! PogChamp".to_string()
}
