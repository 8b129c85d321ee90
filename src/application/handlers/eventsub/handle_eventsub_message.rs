//! HandleEventSubMessageHandler - Command handler for EventSub webhook deliveries.
//!
//! Authenticates the delivery, then branches on message type. Notifications
//! are formatted through the [`FormatterRegistry`] and relayed to chat.

use std::sync::Arc;

use axum::body::Bytes;
use axum::http::HeaderMap;
use secrecy::ExposeSecret;

use crate::domain::eventsub::{
    validate_timestamp, ChallengePayload, FormatterRegistry, MessageType, NotificationPayload,
    RevocationPayload, SignatureContext, WebhookError, MESSAGE_ID_HEADER,
    MESSAGE_SIGNATURE_HEADER, MESSAGE_TIMESTAMP_HEADER, MESSAGE_TYPE_HEADER,
};
use crate::ports::SecretProvider;

use super::chat_relay::ChatRelay;

/// Command to handle one webhook delivery.
#[derive(Debug, Clone)]
pub struct HandleEventSubMessageCommand {
    /// Request headers (lookup is case-insensitive).
    pub headers: HeaderMap,
    /// Raw request body, exactly as received.
    pub payload: Bytes,
}

/// Result of webhook processing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandleEventSubResult {
    /// Verification handshake; the challenge must be echoed verbatim.
    Challenge(String),
    /// Notification formatted and handed to the chat relay.
    Announced { subscription_type: String },
    /// Notification acknowledged without a chat message.
    Unhandled { subscription_type: String },
    /// Subscription revoked by the platform.
    Revoked { subscription_type: String },
    /// Message type not recognised; acknowledged.
    UnknownMessageType(String),
}

/// Handler for EventSub webhook deliveries.
///
/// Holds only shared, read-only collaborators, so one instance can serve
/// concurrent requests.
pub struct HandleEventSubMessageHandler {
    secret_provider: Arc<dyn SecretProvider>,
    formatters: Arc<FormatterRegistry>,
    relay: ChatRelay,
    max_message_age_secs: Option<i64>,
}

impl HandleEventSubMessageHandler {
    pub fn new(
        secret_provider: Arc<dyn SecretProvider>,
        formatters: Arc<FormatterRegistry>,
        relay: ChatRelay,
    ) -> Self {
        Self {
            secret_provider,
            formatters,
            relay,
            max_message_age_secs: None,
        }
    }

    /// Rejects messages whose timestamp is older than `secs`.
    pub fn with_max_message_age(mut self, secs: Option<i64>) -> Self {
        self.max_message_age_secs = secs;
        self
    }

    pub fn handle(
        &self,
        cmd: HandleEventSubMessageCommand,
    ) -> Result<HandleEventSubResult, WebhookError> {
        // 1. Authenticate before looking at the body
        self.authenticate(&cmd)?;

        // 2. Dispatch on message type; a missing header is an unknown type
        let message_type = cmd
            .headers
            .get(MESSAGE_TYPE_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(MessageType::from_header)
            .unwrap_or_else(|| MessageType::Unknown(String::new()));

        match message_type {
            MessageType::Verification => self.handle_verification(&cmd.payload),
            MessageType::Notification => self.handle_notification(&cmd.payload),
            MessageType::Revocation => Ok(self.handle_revocation(&cmd.payload)),
            MessageType::Unknown(raw) => {
                tracing::warn!(message_type = %raw, "Unknown message type");
                Ok(HandleEventSubResult::UnknownMessageType(raw))
            }
        }
    }

    fn authenticate(&self, cmd: &HandleEventSubMessageCommand) -> Result<(), WebhookError> {
        let message_id = required_header(&cmd.headers, MESSAGE_ID_HEADER)?;
        let timestamp = required_header(&cmd.headers, MESSAGE_TIMESTAMP_HEADER)?;
        let signature = required_header(&cmd.headers, MESSAGE_SIGNATURE_HEADER)?;

        let ctx = SignatureContext {
            message_id,
            timestamp,
            body: &cmd.payload,
            signature,
        };

        let secret = self.secret_provider.secret();
        if !ctx.verify(secret.expose_secret().as_bytes()) {
            tracing::warn!(message_id = %message_id, "Signature mismatch");
            return Err(WebhookError::InvalidSignature);
        }

        if let Some(max_age) = self.max_message_age_secs {
            validate_timestamp(timestamp, max_age, chrono::Utc::now()).map_err(|e| {
                tracing::warn!(message_id = %message_id, timestamp = %timestamp, "{}", e);
                e
            })?;
        }

        tracing::debug!(message_id = %message_id, "Signatures match");
        Ok(())
    }

    fn handle_verification(&self, payload: &[u8]) -> Result<HandleEventSubResult, WebhookError> {
        let body: ChallengePayload = serde_json::from_slice(payload).map_err(|e| {
            tracing::warn!(error = %e, "Malformed verification payload");
            WebhookError::ParseError(e.to_string())
        })?;

        let challenge = body
            .challenge
            .ok_or(WebhookError::MissingField("challenge"))?;

        tracing::info!("Answering verification challenge");
        Ok(HandleEventSubResult::Challenge(challenge))
    }

    fn handle_notification(&self, payload: &[u8]) -> Result<HandleEventSubResult, WebhookError> {
        let notification: NotificationPayload = serde_json::from_slice(payload).map_err(|e| {
            tracing::warn!(error = %e, "Malformed notification payload");
            WebhookError::ParseError(e.to_string())
        })?;

        let subscription_type = notification.subscription.subscription_type;
        tracing::debug!(
            subscription_type = %subscription_type,
            event = %notification.event,
            "Notification received"
        );

        match self.formatters.format(&subscription_type, &notification.event) {
            Some(message) => {
                self.relay.relay(message);
                Ok(HandleEventSubResult::Announced { subscription_type })
            }
            None => {
                tracing::info!(
                    subscription_type = %subscription_type,
                    "Notification received but not processed"
                );
                Ok(HandleEventSubResult::Unhandled { subscription_type })
            }
        }
    }

    fn handle_revocation(&self, payload: &[u8]) -> HandleEventSubResult {
        match serde_json::from_slice::<RevocationPayload>(payload) {
            Ok(revocation) => {
                let subscription = revocation.subscription;
                tracing::warn!(
                    subscription_type = %subscription.subscription_type,
                    reason = %subscription.status,
                    condition = %subscription.condition,
                    "Notifications revoked"
                );
                HandleEventSubResult::Revoked {
                    subscription_type: subscription.subscription_type,
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Notifications revoked; payload unreadable");
                HandleEventSubResult::Revoked {
                    subscription_type: String::new(),
                }
            }
        }
    }
}

fn required_header<'a>(
    headers: &'a HeaderMap,
    name: &'static str,
) -> Result<&'a str, WebhookError> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .ok_or(WebhookError::MissingHeader(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::eventsub::compute_signature;
    use crate::ports::{ChatError, ChatSender};
    use async_trait::async_trait;
    use axum::http::HeaderValue;
    use secrecy::SecretString;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;
    use tokio::sync::mpsc;

    const TEST_SECRET: &str = "eventsub_test_secret";
    const MESSAGE_ID: &str = "befa7b53-d79d-478f-86b9-120f112b044e";
    const TIMESTAMP: &str = "2022-11-16T10:11:12.464757833Z";

    // ══════════════════════════════════════════════════════════════
    // Test Infrastructure
    // ══════════════════════════════════════════════════════════════

    struct StaticSecret(&'static str);

    impl SecretProvider for StaticSecret {
        fn secret(&self) -> SecretString {
            SecretString::new(self.0.to_string())
        }
    }

    /// Forwards every `say` into a channel so tests can await delivery.
    struct ChannelSender {
        tx: mpsc::UnboundedSender<(String, String)>,
    }

    #[async_trait]
    impl ChatSender for ChannelSender {
        async fn say(&self, channel: &str, message: &str) -> Result<(), ChatError> {
            let _ = self.tx.send((channel.to_string(), message.to_string()));
            Ok(())
        }
    }

    /// Never completes a send within the test's lifetime.
    struct StalledSender {
        completed: AtomicU32,
    }

    #[async_trait]
    impl ChatSender for StalledSender {
        async fn say(&self, _channel: &str, _message: &str) -> Result<(), ChatError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            self.completed.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn handler_with(sender: Arc<dyn ChatSender>) -> HandleEventSubMessageHandler {
        HandleEventSubMessageHandler::new(
            Arc::new(StaticSecret(TEST_SECRET)),
            Arc::new(FormatterRegistry::with_defaults()),
            ChatRelay::new(sender, "#patdoubleyou"),
        )
    }

    fn recording_handler() -> (
        HandleEventSubMessageHandler,
        mpsc::UnboundedReceiver<(String, String)>,
    ) {
        let (tx, rx) = mpsc::unbounded_channel();
        (handler_with(Arc::new(ChannelSender { tx })), rx)
    }

    fn signed_command(message_type: &str, body: &str) -> HandleEventSubMessageCommand {
        let signature = compute_signature(
            TEST_SECRET.as_bytes(),
            MESSAGE_ID,
            TIMESTAMP,
            body.as_bytes(),
        );
        let mut headers = HeaderMap::new();
        headers.insert(MESSAGE_ID_HEADER, HeaderValue::from_static(MESSAGE_ID));
        headers.insert(MESSAGE_TIMESTAMP_HEADER, HeaderValue::from_static(TIMESTAMP));
        headers.insert(
            MESSAGE_SIGNATURE_HEADER,
            HeaderValue::from_str(&signature).unwrap(),
        );
        headers.insert(
            MESSAGE_TYPE_HEADER,
            HeaderValue::from_str(message_type).unwrap(),
        );

        HandleEventSubMessageCommand {
            headers,
            payload: Bytes::from(body.to_string()),
        }
    }

    fn notification(subscription_type: &str, event: serde_json::Value) -> String {
        serde_json::json!({
            "subscription": {
                "id": "f1c2a387-161a-49f9-a165-0f21d7a4e1c4",
                "type": subscription_type,
                "version": "1",
                "status": "enabled",
                "condition": {"broadcaster_user_id": "1337"}
            },
            "event": event
        })
        .to_string()
    }

    async fn next_message(
        rx: &mut mpsc::UnboundedReceiver<(String, String)>,
    ) -> (String, String) {
        tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("chat message not delivered in time")
            .expect("chat channel closed")
    }

    // ══════════════════════════════════════════════════════════════
    // Authentication
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn missing_signature_header_is_rejected() {
        let (handler, mut rx) = recording_handler();
        let mut cmd = signed_command(
            "notification",
            &notification("channel.follow", serde_json::json!({"user_name": "Foo"})),
        );
        cmd.headers.remove(MESSAGE_SIGNATURE_HEADER);

        let result = handler.handle(cmd);

        assert!(matches!(
            result,
            Err(WebhookError::MissingHeader(MESSAGE_SIGNATURE_HEADER))
        ));
        tokio::task::yield_now().await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn missing_message_id_is_rejected() {
        let (handler, _rx) = recording_handler();
        let mut cmd = signed_command("webhook_callback_verification", r#"{"challenge":"abc"}"#);
        cmd.headers.remove(MESSAGE_ID_HEADER);

        assert!(matches!(
            handler.handle(cmd),
            Err(WebhookError::MissingHeader(MESSAGE_ID_HEADER))
        ));
    }

    #[tokio::test]
    async fn tampered_body_is_rejected_without_chat() {
        let (handler, mut rx) = recording_handler();
        let mut cmd = signed_command(
            "notification",
            &notification("channel.follow", serde_json::json!({"user_name": "Foo"})),
        );
        cmd.payload = Bytes::from(notification(
            "channel.follow",
            serde_json::json!({"user_name": "Mallory"}),
        ));

        let result = handler.handle(cmd);

        assert!(matches!(result, Err(WebhookError::InvalidSignature)));
        tokio::task::yield_now().await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn mismatched_signature_is_rejected_for_every_message_type() {
        let (handler, mut rx) = recording_handler();

        for message_type in [
            "webhook_callback_verification",
            "notification",
            "revocation",
            "mystery",
        ] {
            let mut cmd = signed_command(
                message_type,
                &notification("channel.follow", serde_json::json!({"user_name": "Foo"})),
            );
            cmd.headers.insert(
                MESSAGE_SIGNATURE_HEADER,
                HeaderValue::from_static("sha256=0000"),
            );

            assert!(matches!(
                handler.handle(cmd),
                Err(WebhookError::InvalidSignature)
            ));
        }

        tokio::task::yield_now().await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn header_lookup_is_case_insensitive() {
        let (handler, _rx) = recording_handler();
        let body = r#"{"challenge":"abc123"}"#;
        let signature =
            compute_signature(TEST_SECRET.as_bytes(), MESSAGE_ID, TIMESTAMP, body.as_bytes());

        let mut headers = HeaderMap::new();
        headers.insert("twitch-eventsub-message-id", HeaderValue::from_static(MESSAGE_ID));
        headers.insert("TWITCH-EVENTSUB-MESSAGE-TIMESTAMP", HeaderValue::from_static(TIMESTAMP));
        headers.insert(
            "Twitch-EventSub-Message-Signature",
            HeaderValue::from_str(&signature).unwrap(),
        );
        headers.insert(
            "twitch-eventsub-message-type",
            HeaderValue::from_static("webhook_callback_verification"),
        );

        let result = handler.handle(HandleEventSubMessageCommand {
            headers,
            payload: Bytes::from_static(body.as_bytes()),
        });

        assert_eq!(result.unwrap(), HandleEventSubResult::Challenge("abc123".to_string()));
    }

    #[tokio::test]
    async fn stale_message_is_rejected_when_window_configured() {
        let (handler, _rx) = recording_handler();
        let handler = handler.with_max_message_age(Some(600));
        // TIMESTAMP is years in the past.
        let cmd = signed_command("webhook_callback_verification", r#"{"challenge":"abc"}"#);

        assert!(matches!(
            handler.handle(cmd),
            Err(WebhookError::TimestampOutOfRange)
        ));
    }

    // ══════════════════════════════════════════════════════════════
    // Verification Handshake
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn verification_returns_challenge() {
        let (handler, _rx) = recording_handler();
        let cmd = signed_command("webhook_callback_verification", r#"{"challenge":"abc123"}"#);

        let result = handler.handle(cmd).unwrap();

        assert_eq!(result, HandleEventSubResult::Challenge("abc123".to_string()));
    }

    #[tokio::test]
    async fn verification_without_challenge_is_bad_request() {
        let (handler, _rx) = recording_handler();
        let cmd = signed_command("webhook_callback_verification", r#"{"subscription":{}}"#);

        assert!(matches!(
            handler.handle(cmd),
            Err(WebhookError::MissingField("challenge"))
        ));
    }

    #[tokio::test]
    async fn verification_with_invalid_json_is_parse_error() {
        let (handler, _rx) = recording_handler();
        let cmd = signed_command("webhook_callback_verification", "not json");

        assert!(matches!(
            handler.handle(cmd),
            Err(WebhookError::ParseError(_))
        ));
    }

    // ══════════════════════════════════════════════════════════════
    // Notifications
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn follow_notification_sends_exactly_one_message() {
        let (handler, mut rx) = recording_handler();
        let cmd = signed_command(
            "notification",
            &notification("channel.follow", serde_json::json!({"user_name": "Foo"})),
        );

        let result = handler.handle(cmd).unwrap();

        assert_eq!(
            result,
            HandleEventSubResult::Announced {
                subscription_type: "channel.follow".to_string()
            }
        );
        let (channel, message) = next_message(&mut rx).await;
        assert_eq!(channel, "#patdoubleyou");
        assert!(message.contains("Foo"));
        tokio::task::yield_now().await;
        assert!(rx.try_recv().is_err(), "expected exactly one chat message");
    }

    #[tokio::test]
    async fn gift_notification_uses_registry_formatter() {
        let (handler, mut rx) = recording_handler();
        let cmd = signed_command(
            "notification",
            &notification(
                "channel.subscription.gift",
                serde_json::json!({"user_name": "Gifter", "total": 3}),
            ),
        );

        handler.handle(cmd).unwrap();

        let (_, message) = next_message(&mut rx).await;
        assert_eq!(message, "Gifter has just gifted 3 subs to the channel!");
    }

    #[tokio::test]
    async fn unknown_subscription_type_is_acknowledged_silently() {
        let (handler, mut rx) = recording_handler();
        let cmd = signed_command(
            "notification",
            &notification("channel.ban", serde_json::json!({"user_name": "troll"})),
        );

        let result = handler.handle(cmd).unwrap();

        assert_eq!(
            result,
            HandleEventSubResult::Unhandled {
                subscription_type: "channel.ban".to_string()
            }
        );
        tokio::task::yield_now().await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn notification_without_subscription_is_unhandled() {
        let (handler, mut rx) = recording_handler();
        let cmd = signed_command("notification", r#"{"event":{}}"#);

        let result = handler.handle(cmd).unwrap();

        assert_eq!(
            result,
            HandleEventSubResult::Unhandled {
                subscription_type: String::new()
            }
        );
        tokio::task::yield_now().await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn notification_with_invalid_json_is_parse_error() {
        let (handler, _rx) = recording_handler();
        let cmd = signed_command("notification", "{broken");

        assert!(matches!(
            handler.handle(cmd),
            Err(WebhookError::ParseError(_))
        ));
    }

    #[tokio::test]
    async fn stalled_chat_does_not_block_response() {
        let sender = Arc::new(StalledSender {
            completed: AtomicU32::new(0),
        });
        let handler = handler_with(sender.clone());
        let cmd = signed_command(
            "notification",
            &notification("channel.follow", serde_json::json!({"user_name": "Foo"})),
        );

        let result = handler.handle(cmd);

        assert!(result.is_ok());
        assert_eq!(sender.completed.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn custom_registry_entry_is_dispatched() {
        fn format_ban(_: &serde_json::Value) -> String {
            "The hammer has fallen".to_string()
        }

        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut registry = FormatterRegistry::with_defaults();
        registry.register("channel.ban", format_ban);
        let handler = HandleEventSubMessageHandler::new(
            Arc::new(StaticSecret(TEST_SECRET)),
            Arc::new(registry),
            ChatRelay::new(Arc::new(ChannelSender { tx }), "#patdoubleyou"),
        );

        handler
            .handle(signed_command(
                "notification",
                &notification("channel.ban", serde_json::json!({})),
            ))
            .unwrap();

        let (_, message) = next_message(&mut rx).await;
        assert_eq!(message, "The hammer has fallen");
    }

    // ══════════════════════════════════════════════════════════════
    // Revocation and Unknown Types
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn revocation_is_acknowledged_without_chat() {
        let (handler, mut rx) = recording_handler();
        let body = serde_json::json!({
            "subscription": {
                "type": "channel.follow",
                "status": "authorization_revoked",
                "condition": {"broadcaster_user_id": "1337"}
            }
        })
        .to_string();

        let result = handler.handle(signed_command("revocation", &body)).unwrap();

        assert_eq!(
            result,
            HandleEventSubResult::Revoked {
                subscription_type: "channel.follow".to_string()
            }
        );
        tokio::task::yield_now().await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn revocation_with_invalid_json_is_still_acknowledged() {
        let (handler, _rx) = recording_handler();

        let result = handler.handle(signed_command("revocation", "???")).unwrap();

        assert!(matches!(result, HandleEventSubResult::Revoked { .. }));
    }

    #[tokio::test]
    async fn unknown_message_type_is_acknowledged() {
        let (handler, mut rx) = recording_handler();

        let result = handler
            .handle(signed_command("something_new", r#"{"challenge":"x"}"#))
            .unwrap();

        assert_eq!(
            result,
            HandleEventSubResult::UnknownMessageType("something_new".to_string())
        );
        tokio::task::yield_now().await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn missing_message_type_is_unknown() {
        let (handler, _rx) = recording_handler();
        let mut cmd = signed_command("notification", "{}");
        cmd.headers.remove(MESSAGE_TYPE_HEADER);

        let result = handler.handle(cmd).unwrap();

        assert_eq!(result, HandleEventSubResult::UnknownMessageType(String::new()));
    }
}
