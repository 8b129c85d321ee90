//! Webhook error types for EventSub webhook handling.
//!
//! Defines every condition that stops a webhook request from being dispatched,
//! with HTTP status code mapping.

use axum::http::StatusCode;
use thiserror::Error;

/// Errors that occur during EventSub webhook processing.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// Computed signature did not match the supplied one.
    #[error("Invalid signature")]
    InvalidSignature,

    /// A header needed for signature verification is absent or not UTF-8.
    #[error("Missing header: {0}")]
    MissingHeader(&'static str),

    /// Message timestamp is older than the configured window.
    #[error("Timestamp out of range")]
    TimestampOutOfRange,

    /// Message timestamp is unparseable or too far in the future.
    #[error("Invalid timestamp")]
    InvalidTimestamp,

    /// Failed to parse the webhook payload.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Required field missing from webhook payload.
    #[error("Missing field: {0}")]
    MissingField(&'static str),
}

impl WebhookError {
    /// Returns true if the request failed authentication.
    ///
    /// Authentication failures are answered before any body processing.
    pub fn is_auth_failure(&self) -> bool {
        matches!(
            self,
            WebhookError::InvalidSignature
                | WebhookError::MissingHeader(_)
                | WebhookError::TimestampOutOfRange
                | WebhookError::InvalidTimestamp
        )
    }

    /// Maps the error to an appropriate HTTP status code.
    ///
    /// - 403: the request could not be authenticated
    /// - 400: the request was authentic but its payload was unusable
    pub fn status_code(&self) -> StatusCode {
        match self {
            WebhookError::InvalidSignature
            | WebhookError::MissingHeader(_)
            | WebhookError::TimestampOutOfRange
            | WebhookError::InvalidTimestamp => StatusCode::FORBIDDEN,

            WebhookError::ParseError(_) | WebhookError::MissingField(_) => {
                StatusCode::BAD_REQUEST
            }
        }
    }
}
