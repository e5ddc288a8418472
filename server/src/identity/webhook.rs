//! Identity webhook verification and processing.

use super::{parse_event, IdentityEvent};
use crate::store::{StoreError, UserStore};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::sync::Arc;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Identity webhook processing error.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// Headers are missing, the timestamp is stale, or no signature matches.
    #[error("identity webhook signature verification failed")]
    InvalidSignature,
    /// The body is not a well-formed event.
    #[error("identity webhook payload malformed: {0}")]
    MalformedPayload(String),
    /// The user mutation failed.
    #[error(transparent)]
    Storage(#[from] StoreError),
}

/// The three headers the provider signs deliveries with.
#[derive(Debug, Clone)]
pub struct WebhookHeaders {
    /// Unique message id
    pub id: String,
    /// Delivery timestamp in unix seconds
    pub timestamp: String,
    /// Space-separated `v1,<base64>` signature candidates
    pub signature: String,
}

/// Verify a delivery against the signing secret.
///
/// The secret is the provider's `whsec_`-prefixed value; the key is the
/// base64 payload behind the prefix. Signed content is
/// `"{id}.{timestamp}.{payload}"` and candidate digests are base64.
///
/// # Errors
///
/// Returns [`IdentityError::InvalidSignature`] on any verification failure.
pub fn verify_signature(
    secret: &str,
    headers: &WebhookHeaders,
    payload: &[u8],
    tolerance_secs: u64,
    now: i64,
) -> Result<(), IdentityError> {
    let encoded_key = secret.strip_prefix("whsec_").unwrap_or(secret);
    let key = BASE64
        .decode(encoded_key)
        .map_err(|_| IdentityError::InvalidSignature)?;

    let timestamp: i64 = headers
        .timestamp
        .parse()
        .map_err(|_| IdentityError::InvalidSignature)?;
    if now.abs_diff(timestamp) > tolerance_secs {
        return Err(IdentityError::InvalidSignature);
    }

    let mut mac =
        HmacSha256::new_from_slice(&key).map_err(|_| IdentityError::InvalidSignature)?;
    mac.update(headers.id.as_bytes());
    mac.update(b".");
    mac.update(headers.timestamp.as_bytes());
    mac.update(b".");
    mac.update(payload);
    let expected = BASE64.encode(mac.finalize().into_bytes());

    let matched = headers
        .signature
        .split_whitespace()
        .filter_map(|candidate| candidate.split_once(','))
        .filter(|(version, _)| *version == "v1")
        .any(|(_, digest)| {
            constant_time_eq::constant_time_eq(digest.as_bytes(), expected.as_bytes())
        });

    if matched {
        Ok(())
    } else {
        Err(IdentityError::InvalidSignature)
    }
}

/// Mirrors identity events into the user store.
pub struct IdentityWebhook {
    secret: String,
    tolerance_secs: u64,
    users: Arc<dyn UserStore>,
}

impl IdentityWebhook {
    /// Build a webhook handler.
    pub fn new(secret: impl Into<String>, tolerance_secs: u64, users: Arc<dyn UserStore>) -> Self {
        Self {
            secret: secret.into(),
            tolerance_secs,
            users,
        }
    }

    /// Verify and process one delivery, returning the applied event.
    ///
    /// # Errors
    ///
    /// See [`IdentityError`]. Signature errors are returned before the body
    /// is parsed.
    pub async fn process(
        &self,
        headers: &WebhookHeaders,
        payload: &[u8],
    ) -> Result<IdentityEvent, IdentityError> {
        verify_signature(
            &self.secret,
            headers,
            payload,
            self.tolerance_secs,
            Utc::now().timestamp(),
        )?;

        let event = parse_event(payload).map_err(IdentityError::MalformedPayload)?;
        match &event {
            IdentityEvent::UserCreated(user) | IdentityEvent::UserUpdated(user) => {
                self.users.upsert(user.clone()).await?;
                tracing::info!(user_id = %user.id, "identity record synced");
            }
            IdentityEvent::UserDeleted(id) => {
                self.users.delete(id).await?;
                tracing::info!(user_id = %id, "identity record removed");
            }
            IdentityEvent::Unhandled(event_type) => {
                tracing::debug!(%event_type, "ignoring unhandled identity event");
            }
        }
        Ok(event)
    }
}

/// Build valid signed headers for a payload (test support).
#[must_use]
pub fn sign_payload(secret: &str, id: &str, timestamp: i64, payload: &[u8]) -> WebhookHeaders {
    let encoded_key = secret.strip_prefix("whsec_").unwrap_or(secret);
    let key = BASE64.decode(encoded_key).unwrap_or_default();
    #[allow(clippy::expect_used)] // HMAC accepts keys of any length
    let mut mac = HmacSha256::new_from_slice(&key).expect("hmac key");
    let timestamp = timestamp.to_string();
    mac.update(id.as_bytes());
    mac.update(b".");
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(payload);
    let digest = BASE64.encode(mac.finalize().into_bytes());

    WebhookHeaders {
        id: id.to_string(),
        timestamp,
        signature: format!("v1,{digest}"),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    // base64 of a 24-byte test key
    const SECRET: &str = "whsec_dGVzdC1zaWduaW5nLWtleS0wMDAwMDAwMA==";

    #[test]
    fn accepts_a_valid_delivery() {
        let payload = br#"{"type":"user.created","data":{"id":"user_1"}}"#;
        let headers = sign_payload(SECRET, "msg_1", 1_700_000_000, payload);
        assert!(verify_signature(SECRET, &headers, payload, 300, 1_700_000_030).is_ok());
    }

    #[test]
    fn accepts_a_matching_candidate_among_several() {
        let payload = b"{}";
        let mut headers = sign_payload(SECRET, "msg_1", 1_700_000_000, payload);
        headers.signature = format!("v1,bm90LWl0 {}", headers.signature);
        assert!(verify_signature(SECRET, &headers, payload, 300, 1_700_000_000).is_ok());
    }

    #[test]
    fn rejects_tampering_and_stale_timestamps() {
        let payload = b"{}";
        let headers = sign_payload(SECRET, "msg_1", 1_700_000_000, payload);

        assert!(verify_signature(SECRET, &headers, b"[]", 300, 1_700_000_000).is_err());

        let mut wrong_id = headers.clone();
        wrong_id.id = "msg_2".to_string();
        assert!(verify_signature(SECRET, &wrong_id, payload, 300, 1_700_000_000).is_err());

        assert!(verify_signature(SECRET, &headers, payload, 300, 1_700_001_000).is_err());
    }
}
