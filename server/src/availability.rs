//! Room availability.
//!
//! A room is available for a date range when no stored booking for that room
//! overlaps it under the inclusive comparator. The answer is advisory: the
//! authoritative check happens atomically inside the store at insert time.

use crate::store::BookingStore;
use crate::types::{RoomId, StayDates};
use std::sync::Arc;

/// Answers availability queries against the booking store.
#[derive(Clone)]
pub struct AvailabilityChecker {
    bookings: Arc<dyn BookingStore>,
}

impl AvailabilityChecker {
    /// Build a checker over a booking store.
    #[must_use]
    pub fn new(bookings: Arc<dyn BookingStore>) -> Self {
        Self { bookings }
    }

    /// Whether `room_id` is free for `dates`.
    ///
    /// Fails closed: a storage error reports the room as unavailable rather
    /// than risking a double booking.
    pub async fn is_available(&self, room_id: RoomId, dates: StayDates) -> bool {
        match self.bookings.find_overlapping(room_id, dates).await {
            Ok(conflicts) => conflicts.is_empty(),
            Err(err) => {
                tracing::warn!(%room_id, %dates, error = %err, "availability check failed, reporting unavailable");
                false
            }
        }
    }
}
