//! HTTP handlers.
//!
//! Business failures travel in-band as HTTP 200 with `success: false`;
//! [`lodging_web::ApiError`] covers authentication, webhook signature, and
//! internal failures that must surface as a non-2xx status.

pub mod bookings;
pub mod rooms;
pub mod users;
pub mod webhooks;

use serde::Serialize;

/// Payload for envelopes that carry no operation-specific fields.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Empty {}
