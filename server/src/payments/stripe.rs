//! Stripe-backed [`PaymentProvider`].
//!
//! Talks to the Checkout Sessions API over form-encoded HTTP. All calls run
//! under the configured request timeout so a slow provider cannot stall a
//! booking request.

use super::{CheckoutRequest, CheckoutSession, PaymentError, PaymentProvider};
use crate::config::PaymentsConfig;
use crate::types::BookingId;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use uuid::Uuid;

/// Client for the provider's Checkout Sessions API.
pub struct StripeClient {
    http: reqwest::Client,
    api_base: String,
    secret_key: String,
    success_url: String,
    cancel_url: String,
}

#[derive(Debug, Deserialize)]
struct SessionObject {
    id: String,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    payment_intent: Option<String>,
    #[serde(default)]
    metadata: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct SessionList {
    #[serde(default)]
    data: Vec<SessionObject>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    #[serde(default)]
    message: String,
}

impl StripeClient {
    /// Build a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`PaymentError::Unreachable`] if the HTTP client cannot be
    /// constructed.
    pub fn new(config: &PaymentsConfig) -> Result<Self, PaymentError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout))
            .build()
            .map_err(|e| PaymentError::Unreachable(e.to_string()))?;

        Ok(Self {
            http,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            secret_key: config.secret_key.clone(),
            success_url: config.success_url.clone(),
            cancel_url: config.cancel_url.clone(),
        })
    }

    fn session_from_object(object: SessionObject) -> CheckoutSession {
        let booking_id = object
            .metadata
            .get("bookingId")
            .and_then(|s| Uuid::parse_str(s).ok())
            .map(BookingId::from_uuid);

        CheckoutSession {
            id: object.id,
            url: object.url,
            payment_intent: object.payment_intent,
            booking_id,
        }
    }

    async fn error_from_response(response: reqwest::Response) -> PaymentError {
        let status = response.status().as_u16();
        let message = match response.json::<ApiErrorBody>().await {
            Ok(body) => body.error.message,
            Err(_) => "unreadable error body".to_string(),
        };
        PaymentError::Rejected { status, message }
    }
}

#[async_trait]
impl PaymentProvider for StripeClient {
    async fn create_checkout_session(
        &self,
        request: CheckoutRequest,
    ) -> Result<CheckoutSession, PaymentError> {
        let amount = request.amount.cents().to_string();
        let booking_id = request.booking_id.to_string();
        let form: Vec<(&str, &str)> = vec![
            ("mode", "payment"),
            ("success_url", &self.success_url),
            ("cancel_url", &self.cancel_url),
            ("line_items[0][quantity]", "1"),
            ("line_items[0][price_data][currency]", "usd"),
            ("line_items[0][price_data][unit_amount]", &amount),
            (
                "line_items[0][price_data][product_data][name]",
                &request.description,
            ),
            ("metadata[bookingId]", &booking_id),
        ];

        let response = self
            .http
            .post(format!("{}/v1/checkout/sessions", self.api_base))
            .bearer_auth(&self.secret_key)
            .form(&form)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }

        let object: SessionObject = response
            .json()
            .await
            .map_err(|e| PaymentError::Malformed(e.to_string()))?;
        Ok(Self::session_from_object(object))
    }

    async fn find_session_by_intent(
        &self,
        payment_intent: &str,
    ) -> Result<Option<CheckoutSession>, PaymentError> {
        let response = self
            .http
            .get(format!("{}/v1/checkout/sessions", self.api_base))
            .bearer_auth(&self.secret_key)
            .query(&[("payment_intent", payment_intent), ("limit", "1")])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }

        let list: SessionList = response
            .json()
            .await
            .map_err(|e| PaymentError::Malformed(e.to_string()))?;
        Ok(list.data.into_iter().next().map(Self::session_from_object))
    }
}
