//! Shared application state.

use crate::booking::BookingService;
use crate::identity::IdentityWebhook;
use crate::payments::webhook::PaymentWebhook;
use crate::store::{RoomStore, UserStore};
use sqlx::PgPool;
use std::sync::Arc;

/// State handed to every handler.
#[derive(Clone)]
pub struct AppState {
    /// Booking lifecycle service
    pub bookings: Arc<BookingService>,
    /// Room and hotel reads
    pub rooms: Arc<dyn RoomStore>,
    /// Identity-synced users
    pub users: Arc<dyn UserStore>,
    /// Payment confirmation webhook handler
    pub payment_webhook: Arc<PaymentWebhook>,
    /// Identity sync webhook handler
    pub identity_webhook: Arc<IdentityWebhook>,
    /// Database pool, absent when running on the in-memory store
    pub db: Option<PgPool>,
}
