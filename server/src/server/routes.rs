//! Route table.

use crate::api::{bookings, rooms, users, webhooks};
use crate::server::health;
use crate::server::state::AppState;
use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

/// Build the application router.
#[must_use]
pub fn build_router(state: AppState) -> Router {
    let api = Router::new()
        .route(
            "/bookings/check-availability",
            post(bookings::check_availability),
        )
        .route("/bookings/book", post(bookings::create_booking))
        .route("/bookings/user", get(bookings::user_bookings))
        .route("/bookings/hotel", get(bookings::hotel_bookings))
        .route("/bookings/:id/pay", post(bookings::create_checkout))
        .route("/rooms", get(rooms::list_rooms))
        .route("/rooms/:id", get(rooms::get_room))
        .route("/user", get(users::get_profile))
        .route("/user/store-recent-search", post(users::store_recent_search))
        .route("/webhooks/payments", post(webhooks::payments))
        .route("/webhooks/identity", post(webhooks::identity));

    Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
