//! Hotel booking backend.
//!
//! The core is the booking lifecycle and its availability integrity: a room
//! can never hold two overlapping bookings, a booking's price is fixed at
//! creation from the stored nightly rate, and the paid flag only ever moves
//! from unpaid to paid, driven by verified payment provider webhooks.
//!
//! Module map:
//! - [`types`]: domain values and entities
//! - [`store`]: persistence traits, Postgres and in-memory backends
//! - [`availability`], [`booking`]: the domain services
//! - [`payments`], [`identity`]: external provider integration and webhooks
//! - [`auth`], [`api`], [`server`]: the HTTP surface

pub mod api;
pub mod auth;
pub mod availability;
pub mod booking;
pub mod config;
pub mod identity;
pub mod notify;
pub mod payments;
pub mod retry;
pub mod server;
pub mod store;
pub mod types;

pub use booking::{BookingError, BookingRequest, BookingService};
pub use config::Config;
pub use server::{build_router, AppState};
