//! EventSub message types and payloads.
//!
//! Only the fields each message type needs are captured. Each payload is
//! parsed separately, after the message type is known.

use serde::Deserialize;

/// Header carrying the unique message id.
pub const MESSAGE_ID_HEADER: &str = "Twitch-Eventsub-Message-Id";
/// Header carrying the RFC 3339 send timestamp.
pub const MESSAGE_TIMESTAMP_HEADER: &str = "Twitch-Eventsub-Message-Timestamp";
/// Header carrying the `sha256=` signature.
pub const MESSAGE_SIGNATURE_HEADER: &str = "Twitch-Eventsub-Message-Signature";
/// Header carrying the message type.
pub const MESSAGE_TYPE_HEADER: &str = "Twitch-Eventsub-Message-Type";

/// Kind of EventSub message, taken from the message type header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageType {
    /// Endpoint ownership handshake.
    Verification,
    /// Event notification.
    Notification,
    /// Subscription revoked by the platform.
    Revocation,
    /// Anything else, including a missing header (empty string).
    Unknown(String),
}

impl MessageType {
    /// Parse message type from its header value.
    pub fn from_header(value: &str) -> Self {
        match value {
            "webhook_callback_verification" => Self::Verification,
            "notification" => Self::Notification,
            "revocation" => Self::Revocation,
            other => Self::Unknown(other.to_string()),
        }
    }

    /// Convert to the header value.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Verification => "webhook_callback_verification",
            Self::Notification => "notification",
            Self::Revocation => "revocation",
            Self::Unknown(raw) => raw,
        }
    }
}

/// Subscription descriptor carried by notifications and revocations.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Subscription {
    #[serde(default)]
    pub id: String,

    /// Subscription type, e.g. `channel.follow`.
    #[serde(rename = "type", default)]
    pub subscription_type: String,

    #[serde(default)]
    pub version: String,

    /// Subscription status; for revocations this is the reason.
    #[serde(default)]
    pub status: String,

    /// Condition the subscription was created with.
    #[serde(default)]
    pub condition: serde_json::Value,
}

/// Body of a verification handshake.
#[derive(Debug, Clone, Deserialize)]
pub struct ChallengePayload {
    pub challenge: Option<String>,
}

/// Body of an event notification.
#[derive(Debug, Clone, Deserialize)]
pub struct NotificationPayload {
    #[serde(default)]
    pub subscription: Subscription,

    /// Event data; shape depends on the subscription type.
    #[serde(default)]
    pub event: serde_json::Value,
}

/// Body of a revocation.
#[derive(Debug, Clone, Deserialize)]
pub struct RevocationPayload {
    #[serde(default)]
    pub subscription: Subscription,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_message_types() {
        assert_eq!(
            MessageType::from_header("webhook_callback_verification"),
            MessageType::Verification
        );
        assert_eq!(
            MessageType::from_header("notification"),
            MessageType::Notification
        );
        assert_eq!(
            MessageType::from_header("revocation"),
            MessageType::Revocation
        );
    }

    #[test]
    fn message_type_matching_is_exact() {
        assert_eq!(
            MessageType::from_header("Notification"),
            MessageType::Unknown("Notification".to_string())
        );
    }

    #[test]
    fn unknown_message_type_keeps_raw_value() {
        let parsed = MessageType::from_header("something_new");
        assert_eq!(parsed.as_str(), "something_new");
    }

    #[test]
    fn as_str_round_trips_known_types() {
        for raw in ["webhook_callback_verification", "notification", "revocation"] {
            assert_eq!(MessageType::from_header(raw).as_str(), raw);
        }
    }

    #[test]
    fn notification_payload_captures_subscription_and_event() {
        let payload: NotificationPayload = serde_json::from_str(
            r#"{
                "subscription": {
                    "id": "f1c2a387-161a-49f9-a165-0f21d7a4e1c4",
                    "type": "channel.follow",
                    "version": "2",
                    "status": "enabled",
                    "condition": {"broadcaster_user_id": "1337"},
                    "cost": 0
                },
                "event": {"user_name": "Foo"}
            }"#,
        )
        .unwrap();

        assert_eq!(payload.subscription.subscription_type, "channel.follow");
        assert_eq!(payload.subscription.version, "2");
        assert_eq!(payload.event["user_name"], "Foo");
    }

    #[test]
    fn notification_payload_without_subscription_defaults() {
        let payload: NotificationPayload = serde_json::from_str("{}").unwrap();

        assert_eq!(payload.subscription.subscription_type, "");
        assert!(payload.event.is_null());
    }

    #[test]
    fn challenge_payload_tolerates_missing_challenge() {
        let payload: ChallengePayload =
            serde_json::from_str(r#"{"subscription":{}}"#).unwrap();
        assert!(payload.challenge.is_none());
    }

    #[test]
    fn revocation_payload_captures_reason_and_condition() {
        let payload: RevocationPayload = serde_json::from_str(
            r#"{
                "subscription": {
                    "type": "channel.follow",
                    "status": "authorization_revoked",
                    "condition": {"broadcaster_user_id": "12826"}
                }
            }"#,
        )
        .unwrap();

        assert_eq!(payload.subscription.status, "authorization_revoked");
        assert_eq!(
            payload.subscription.condition["broadcaster_user_id"],
            "12826"
        );
    }
}
