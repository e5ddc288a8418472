//! Payment confirmation webhooks.
//!
//! The provider posts signed events; nothing is trusted until the
//! `Stripe-Signature` header verifies against the raw body. Verification
//! happens before any parsing or state change, and a failed signature never
//! mutates anything.
//!
//! The scheme: the header carries `t=<unix seconds>` and one or more
//! `v1=<hex digest>` entries. The expected digest is HMAC-SHA256 over
//! `"{t}.{raw body}"` keyed with the endpoint secret. Comparison is
//! constant-time and the timestamp must fall within the configured
//! tolerance.

use super::{PaymentError, PaymentProvider};
use crate::retry::RetryPolicy;
use crate::store::{BookingStore, PaidOutcome, StoreError};
use crate::types::{BookingId, PaymentMethod};
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use std::sync::Arc;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Event type that settles a booking.
const PAYMENT_SUCCEEDED: &str = "payment_intent.succeeded";

/// Webhook processing error.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// The signature header is missing, malformed, stale, or wrong.
    #[error("webhook signature verification failed")]
    InvalidSignature,
    /// The body is not a well-formed event.
    #[error("webhook payload malformed: {0}")]
    MalformedPayload(String),
    /// No checkout session exists for the confirmed payment intent.
    #[error("no checkout session found for payment intent {0}")]
    SessionNotFound(String),
    /// The session carries no booking reference.
    #[error("checkout session {0} has no booking metadata")]
    MissingBookingMetadata(String),
    /// The provider lookup failed.
    #[error(transparent)]
    Provider(#[from] PaymentError),
    /// The booking update failed.
    #[error(transparent)]
    Storage(#[from] StoreError),
}

/// Verify a `t=...,v1=...` signature header against the raw payload.
///
/// `now` is the verifier's clock in unix seconds.
///
/// # Errors
///
/// Returns [`WebhookError::InvalidSignature`] unless the header parses, the
/// timestamp is within `tolerance_secs` of `now`, and at least one `v1`
/// entry matches the expected digest.
pub fn verify_signature(
    secret: &str,
    header: &str,
    payload: &[u8],
    tolerance_secs: u64,
    now: i64,
) -> Result<(), WebhookError> {
    let mut timestamp: Option<i64> = None;
    let mut candidates: Vec<&str> = Vec::new();

    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = value.parse().ok(),
            Some(("v1", value)) => candidates.push(value),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or(WebhookError::InvalidSignature)?;
    if candidates.is_empty() {
        return Err(WebhookError::InvalidSignature);
    }

    let skew = now.abs_diff(timestamp);
    if skew > tolerance_secs {
        return Err(WebhookError::InvalidSignature);
    }

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| WebhookError::InvalidSignature)?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    let expected = hex::encode(mac.finalize().into_bytes());

    let matched = candidates
        .iter()
        .any(|c| constant_time_eq::constant_time_eq(c.as_bytes(), expected.as_bytes()));
    if matched {
        Ok(())
    } else {
        Err(WebhookError::InvalidSignature)
    }
}

// The type tag is parsed on its own first: unrecognized events carry
// arbitrary object shapes and must still be acknowledged, so only the
// succeeded event's payload is held to the intent-id shape.
#[derive(Debug, Deserialize)]
struct EventKind {
    #[serde(rename = "type")]
    event_type: String,
}

#[derive(Debug, Deserialize)]
struct SucceededEvent {
    data: EventData,
}

#[derive(Debug, Deserialize)]
struct EventData {
    object: EventObject,
}

#[derive(Debug, Deserialize)]
struct EventObject {
    id: String,
}

/// Result of processing a verified event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// A booking transitioned (or had already transitioned) to paid.
    Confirmed {
        /// Booking the payment settled
        booking_id: BookingId,
        /// Whether this delivery changed anything
        outcome: PaidOutcome,
    },
    /// The event type is not handled; acknowledged without side effects.
    Ignored {
        /// Event type as received
        event_type: String,
    },
}

/// Handles provider confirmation events against the booking store.
pub struct PaymentWebhook {
    secret: String,
    tolerance_secs: u64,
    provider: Arc<dyn PaymentProvider>,
    bookings: Arc<dyn BookingStore>,
    retry: RetryPolicy,
}

impl PaymentWebhook {
    /// Build a webhook handler.
    pub fn new(
        secret: impl Into<String>,
        tolerance_secs: u64,
        provider: Arc<dyn PaymentProvider>,
        bookings: Arc<dyn BookingStore>,
    ) -> Self {
        Self {
            secret: secret.into(),
            tolerance_secs,
            provider,
            bookings,
            retry: RetryPolicy::default(),
        }
    }

    /// Verify and process one delivery.
    ///
    /// Duplicate deliveries are safe: the underlying paid update is
    /// idempotent and a replay reports [`PaidOutcome::AlreadyPaid`].
    ///
    /// # Errors
    ///
    /// See [`WebhookError`]. Signature errors are returned before the body
    /// is parsed.
    pub async fn process(
        &self,
        signature_header: &str,
        payload: &[u8],
    ) -> Result<WebhookOutcome, WebhookError> {
        verify_signature(
            &self.secret,
            signature_header,
            payload,
            self.tolerance_secs,
            Utc::now().timestamp(),
        )?;

        let kind: EventKind = serde_json::from_slice(payload)
            .map_err(|e| WebhookError::MalformedPayload(e.to_string()))?;

        if kind.event_type != PAYMENT_SUCCEEDED {
            tracing::debug!(event_type = %kind.event_type, "ignoring unhandled payment event");
            return Ok(WebhookOutcome::Ignored {
                event_type: kind.event_type,
            });
        }

        let event: SucceededEvent = serde_json::from_slice(payload)
            .map_err(|e| WebhookError::MalformedPayload(e.to_string()))?;
        let intent = event.data.object.id;
        let session = self
            .retry
            .run(|| self.provider.find_session_by_intent(&intent))
            .await?
            .ok_or_else(|| WebhookError::SessionNotFound(intent.clone()))?;

        let booking_id = session
            .booking_id
            .ok_or_else(|| WebhookError::MissingBookingMetadata(session.id.clone()))?;

        let outcome = self
            .bookings
            .mark_paid(booking_id, PaymentMethod::Stripe)
            .await?;

        match outcome {
            PaidOutcome::Updated => {
                tracing::info!(%booking_id, %intent, "booking confirmed as paid");
            }
            PaidOutcome::AlreadyPaid => {
                tracing::info!(%booking_id, %intent, "duplicate confirmation ignored");
            }
        }

        Ok(WebhookOutcome::Confirmed {
            booking_id,
            outcome,
        })
    }
}

/// Build a valid signature header for a payload (test support).
#[must_use]
pub fn sign_payload(secret: &str, payload: &[u8], timestamp: i64) -> String {
    #[allow(clippy::expect_used)] // HMAC accepts keys of any length
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("hmac key");
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    format!("t={timestamp},v1={}", hex::encode(mac.finalize().into_bytes()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test";

    #[test]
    fn accepts_a_valid_signature() {
        let payload = br#"{"type":"payment_intent.succeeded"}"#;
        let header = sign_payload(SECRET, payload, 1_700_000_000);
        assert!(verify_signature(SECRET, &header, payload, 300, 1_700_000_010).is_ok());
    }

    #[test]
    fn rejects_wrong_secret_and_tampered_payload() {
        let payload = br#"{"type":"payment_intent.succeeded"}"#;
        let header = sign_payload(SECRET, payload, 1_700_000_000);

        assert!(matches!(
            verify_signature("whsec_other", &header, payload, 300, 1_700_000_010),
            Err(WebhookError::InvalidSignature)
        ));
        assert!(matches!(
            verify_signature(SECRET, &header, b"{}", 300, 1_700_000_010),
            Err(WebhookError::InvalidSignature)
        ));
    }

    #[test]
    fn rejects_stale_timestamp() {
        let payload = b"{}";
        let header = sign_payload(SECRET, payload, 1_700_000_000);
        assert!(matches!(
            verify_signature(SECRET, &header, payload, 300, 1_700_000_500),
            Err(WebhookError::InvalidSignature)
        ));
    }

    #[test]
    fn rejects_missing_parts() {
        let payload = b"{}";
        assert!(verify_signature(SECRET, "v1=abcd", payload, 300, 0).is_err());
        assert!(verify_signature(SECRET, "t=100", payload, 300, 100).is_err());
        assert!(verify_signature(SECRET, "", payload, 300, 0).is_err());
    }
}
