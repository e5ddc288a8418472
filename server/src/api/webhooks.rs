//! Webhook endpoints.
//!
//! Both endpoints read the raw body: signatures are computed over exact
//! bytes, so the payload must not pass through JSON extraction first.
//! Signature failures return 400 and mutate nothing. After a valid
//! signature, payment events are always acknowledged (failures are logged,
//! never surfaced, so the provider does not retry-storm), while identity
//! storage failures return 500 so the provider redelivers.

use super::Empty;
use crate::identity::webhook::IdentityError;
use crate::identity::WebhookHeaders;
use crate::payments::webhook::WebhookError;
use crate::server::state::AppState;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use lodging_web::{ApiError, Envelope};
use serde::Serialize;

/// Payment provider acknowledgement.
#[derive(Debug, Serialize)]
pub struct ReceivedBody {
    received: bool,
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// `POST /api/webhooks/payments`
pub async fn payments(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Envelope<ReceivedBody>, ApiError> {
    let signature = header(&headers, "Stripe-Signature")
        .ok_or_else(|| ApiError::bad_request("Missing signature header"))?;

    // Processing failures after a valid signature are logged and acked; a
    // non-2xx here would only trigger provider retry storms the handler
    // cannot resolve. Signature failures are the exception.
    match state.payment_webhook.process(signature, &body).await {
        Ok(_) => {}
        Err(WebhookError::InvalidSignature) => {
            return Err(ApiError::bad_request("Invalid signature"));
        }
        Err(WebhookError::MalformedPayload(_)) => {
            return Err(ApiError::bad_request("Malformed payload"));
        }
        Err(err) => {
            tracing::error!(error = %err, "payment event processing failed");
        }
    }

    Ok(Envelope::ok(ReceivedBody { received: true }))
}

/// `POST /api/webhooks/identity`
pub async fn identity(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Envelope<Empty>, ApiError> {
    let delivery = match (
        header(&headers, "svix-id"),
        header(&headers, "svix-timestamp"),
        header(&headers, "svix-signature"),
    ) {
        (Some(id), Some(timestamp), Some(signature)) => WebhookHeaders {
            id: id.to_string(),
            timestamp: timestamp.to_string(),
            signature: signature.to_string(),
        },
        _ => return Err(ApiError::bad_request("Missing signature headers")),
    };

    state
        .identity_webhook
        .process(&delivery, &body)
        .await
        .map_err(|err| match err {
            IdentityError::InvalidSignature => ApiError::bad_request("Invalid signature"),
            IdentityError::MalformedPayload(_) => ApiError::bad_request("Malformed payload"),
            other @ IdentityError::Storage(_) => {
                ApiError::internal("Failed to process identity event").with_source(other.into())
            }
        })?;

    Ok(Envelope::ok_with_message(Empty {}, "Webhook received"))
}
