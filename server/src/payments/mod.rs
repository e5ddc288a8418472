//! Payment provider integration.
//!
//! [`PaymentProvider`] is the seam between the booking flow and the card
//! provider: creating hosted checkout sessions and resolving a session from
//! a payment intent when a confirmation webhook arrives. [`StripeClient`] is
//! the production implementation; [`MockPaymentProvider`] backs tests.

pub mod stripe;
pub mod webhook;

pub use stripe::StripeClient;

use crate::types::{BookingId, Money};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;

/// Payment provider error.
#[derive(Debug, Error)]
pub enum PaymentError {
    /// The provider could not be reached or timed out.
    #[error("payment provider unreachable: {0}")]
    Unreachable(String),
    /// The provider answered with a non-success status.
    #[error("payment provider rejected the request ({status}): {message}")]
    Rejected {
        /// HTTP status returned by the provider
        status: u16,
        /// Provider error message
        message: String,
    },
    /// The provider response could not be decoded.
    #[error("payment provider response malformed: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for PaymentError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Malformed(err.to_string())
        } else {
            Self::Unreachable(err.to_string())
        }
    }
}

/// What the booking flow asks the provider to collect.
#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    /// Booking the payment settles; carried through provider metadata
    pub booking_id: BookingId,
    /// Line-item label shown on the hosted page
    pub description: String,
    /// Amount to collect
    pub amount: Money,
}

/// A provider-hosted checkout session.
#[derive(Debug, Clone)]
pub struct CheckoutSession {
    /// Provider session id
    pub id: String,
    /// Hosted payment page URL, present on freshly created sessions
    pub url: Option<String>,
    /// Payment intent attached to the session, present once payment starts
    pub payment_intent: Option<String>,
    /// Booking id recovered from session metadata
    pub booking_id: Option<BookingId>,
}

/// Boundary to the external card provider.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Create a hosted checkout session for a booking.
    async fn create_checkout_session(
        &self,
        request: CheckoutRequest,
    ) -> Result<CheckoutSession, PaymentError>;

    /// Resolve the checkout session a payment intent belongs to.
    ///
    /// Returns `Ok(None)` when the provider knows no such session.
    async fn find_session_by_intent(
        &self,
        payment_intent: &str,
    ) -> Result<Option<CheckoutSession>, PaymentError>;
}

/// In-memory provider for tests: sessions are fabricated locally and
/// indexed by a predictable payment intent.
#[derive(Default)]
pub struct MockPaymentProvider {
    sessions: Mutex<HashMap<String, CheckoutSession>>,
    fail_next: Mutex<bool>,
}

impl MockPaymentProvider {
    /// Create an empty mock provider.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared handle, matching how providers hang off application state.
    #[must_use]
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Make the next provider call fail as unreachable.
    pub async fn fail_next(&self) {
        *self.fail_next.lock().await = true;
    }

    /// Register a session directly, as if payment had started elsewhere.
    pub async fn seed_session(&self, session: CheckoutSession) {
        if let Some(intent) = session.payment_intent.clone() {
            self.sessions.lock().await.insert(intent, session);
        }
    }

    async fn take_failure(&self) -> bool {
        let mut flag = self.fail_next.lock().await;
        std::mem::take(&mut *flag)
    }
}

#[async_trait]
impl PaymentProvider for MockPaymentProvider {
    async fn create_checkout_session(
        &self,
        request: CheckoutRequest,
    ) -> Result<CheckoutSession, PaymentError> {
        if self.take_failure().await {
            return Err(PaymentError::Unreachable("mock outage".to_string()));
        }

        let intent = format!("pi_mock_{}", request.booking_id);
        let session = CheckoutSession {
            id: format!("cs_mock_{}", request.booking_id),
            url: Some(format!("https://pay.example.com/{}", request.booking_id)),
            payment_intent: Some(intent.clone()),
            booking_id: Some(request.booking_id),
        };
        self.sessions.lock().await.insert(intent, session.clone());
        Ok(session)
    }

    async fn find_session_by_intent(
        &self,
        payment_intent: &str,
    ) -> Result<Option<CheckoutSession>, PaymentError> {
        if self.take_failure().await {
            return Err(PaymentError::Unreachable("mock outage".to_string()));
        }
        Ok(self.sessions.lock().await.get(payment_intent).cloned())
    }
}
