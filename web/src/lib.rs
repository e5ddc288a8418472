//! Shared Axum plumbing for the lodging services.
//!
//! This crate carries the HTTP-facing pieces that are independent of the
//! booking domain:
//!
//! - [`error::ApiError`] — error type with an `IntoResponse` impl
//! - [`envelope`] — the in-band `{ success, … }` response envelope used by
//!   every business endpoint
//! - [`extractors`] — small request extractors (correlation id)

pub mod envelope;
pub mod error;
pub mod extractors;

pub use envelope::Envelope;
pub use error::ApiError;
pub use extractors::CorrelationId;
