//! Booking endpoints.

use crate::auth::AuthenticatedUser;
use crate::booking::{BookingError, BookingRequest, HotelDashboard};
use crate::server::state::AppState;
use crate::types::{Booking, BookingId, RoomId};
use axum::extract::{Path, State};
use axum::Json;
use chrono::NaiveDate;
use lodging_web::{ApiError, CorrelationId, Envelope};
use serde::{Deserialize, Serialize};

/// Body of an availability query.
#[derive(Debug, Deserialize)]
pub struct AvailabilityQuery {
    /// Room to check
    #[serde(rename = "room")]
    pub room_id: RoomId,
    /// Requested check-in date
    #[serde(rename = "checkInDate")]
    pub check_in: NaiveDate,
    /// Requested check-out date
    #[serde(rename = "checkOutDate")]
    pub check_out: NaiveDate,
}

/// Availability answer.
#[derive(Debug, Serialize)]
pub struct AvailabilityBody {
    #[serde(rename = "isAvailable")]
    is_available: bool,
}

/// A single booking.
#[derive(Debug, Serialize)]
pub struct BookingBody {
    booking: Booking,
}

/// A list of bookings.
#[derive(Debug, Serialize)]
pub struct BookingsBody {
    bookings: Vec<Booking>,
}

/// Owner dashboard payload.
#[derive(Debug, Serialize)]
pub struct DashboardBody {
    #[serde(rename = "dashboardData")]
    dashboard: HotelDashboard,
}

/// Hosted checkout redirect.
#[derive(Debug, Serialize)]
pub struct CheckoutBody {
    url: String,
}

/// Turn a booking failure into an in-band envelope or a 500.
///
/// Validation and conflict outcomes are business results the client acts
/// on; storage failures are not theirs to see.
fn business<T: Serialize>(err: BookingError) -> Result<Envelope<T>, ApiError> {
    match err {
        BookingError::Storage(inner) => {
            Err(ApiError::internal("Failed to process booking").with_source(inner.into()))
        }
        other => Ok(Envelope::fail(other.to_string())),
    }
}

/// `POST /api/bookings/check-availability`
pub async fn check_availability(
    State(state): State<AppState>,
    correlation_id: CorrelationId,
    Json(query): Json<AvailabilityQuery>,
) -> Result<Envelope<AvailabilityBody>, ApiError> {
    tracing::debug!(correlation_id = %correlation_id.0, room_id = %query.room_id, "availability query");

    match state
        .bookings
        .check_availability(query.room_id, query.check_in, query.check_out)
        .await
    {
        Ok(is_available) => Ok(Envelope::ok(AvailabilityBody { is_available })),
        Err(err) => business(err),
    }
}

/// `POST /api/bookings/book`
pub async fn create_booking(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    correlation_id: CorrelationId,
    Json(request): Json<BookingRequest>,
) -> Result<Envelope<BookingBody>, ApiError> {
    tracing::info!(
        correlation_id = %correlation_id.0,
        user_id = %user.id,
        room_id = %request.room_id,
        "booking requested"
    );

    match state.bookings.create_booking(&user, request).await {
        Ok(booking) => Ok(Envelope::ok_with_message(
            BookingBody { booking },
            "Booking created successfully",
        )),
        Err(err) => business(err),
    }
}

/// `GET /api/bookings/user`
pub async fn user_bookings(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<Envelope<BookingsBody>, ApiError> {
    match state.bookings.bookings_for_user(&user.id).await {
        Ok(bookings) => Ok(Envelope::ok(BookingsBody { bookings })),
        Err(err) => business(err),
    }
}

/// `GET /api/bookings/hotel`
pub async fn hotel_bookings(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<Envelope<DashboardBody>, ApiError> {
    match state.bookings.hotel_dashboard(&user.id).await {
        Ok(dashboard) => Ok(Envelope::ok(DashboardBody { dashboard })),
        Err(err) => business(err),
    }
}

/// Path parameter for checkout creation.
#[derive(Debug, Deserialize)]
pub struct BookingPath {
    /// Booking to pay for
    pub id: BookingId,
}

/// `POST /api/bookings/:id/pay`
pub async fn create_checkout(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(path): Path<BookingPath>,
) -> Result<Envelope<CheckoutBody>, ApiError> {
    match state.bookings.create_checkout(&user.id, path.id).await {
        Ok(session) => match session.url {
            Some(url) => Ok(Envelope::ok(CheckoutBody { url })),
            None => Ok(Envelope::fail("Payment session has no redirect URL")),
        },
        Err(BookingError::Payment(err)) => {
            tracing::warn!(booking_id = %path.id, error = %err, "checkout creation failed");
            Ok(Envelope::fail("Payment service is currently unavailable"))
        }
        Err(err) => business(err),
    }
}
