//! Storage layer: booking, room, and user persistence.
//!
//! The traits here are the seams between the domain services and the
//! concrete backends. [`postgres::PostgresStore`] is the production backend;
//! [`memory::MemoryStore`] backs tests and the demo binary.
//!
//! The central contract is [`BookingStore::insert`]: the overlap check and
//! the insert must be atomic per room, so two concurrent requests for
//! overlapping date ranges can never both succeed. Postgres enforces this
//! with a range exclusion constraint; the memory store serializes
//! check+insert through a per-room mutex.

pub mod memory;
pub mod postgres;

use crate::types::{
    Booking, BookingId, Hotel, HotelId, PaymentMethod, Room, RoomId, StayDates, User, UserId,
};
use async_trait::async_trait;
use thiserror::Error;

/// Storage-layer error.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The insert would overlap an existing booking for the same room.
    #[error("booking overlaps an existing reservation for the room")]
    OverlapConflict,
    /// The referenced record does not exist.
    #[error("{0} not found")]
    NotFound(&'static str),
    /// Backend failure (connection, query, serialization).
    #[error("storage backend error: {0}")]
    Backend(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        Self::Backend(err.to_string())
    }
}

/// Result alias for storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Outcome of an idempotent `mark_paid` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaidOutcome {
    /// The booking transitioned from unpaid to paid.
    Updated,
    /// The booking was already paid; nothing changed.
    AlreadyPaid,
}

/// Fields of a booking about to be persisted.
///
/// `is_paid` is intentionally absent: new bookings are always stored unpaid,
/// and only the payment confirmation path flips the flag.
#[derive(Debug, Clone)]
pub struct NewBooking {
    /// Owning user
    pub user_id: UserId,
    /// Booked room
    pub room_id: RoomId,
    /// Hotel the room belongs to
    pub hotel_id: HotelId,
    /// Check-in/check-out dates
    pub dates: StayDates,
    /// Number of guests
    pub guest_count: u32,
    /// Price fixed by the booking service
    pub total_price: crate::types::Money,
    /// Selected payment method
    pub payment_method: PaymentMethod,
}

/// Persistence for bookings.
#[async_trait]
pub trait BookingStore: Send + Sync {
    /// All bookings for `room_id` whose stored interval overlaps `dates`
    /// under the conservative inclusive comparator.
    async fn find_overlapping(&self, room_id: RoomId, dates: StayDates) -> Result<Vec<Booking>>;

    /// Persist a new booking with `is_paid = false`.
    ///
    /// Atomic with respect to the no-overlap invariant: returns
    /// [`StoreError::OverlapConflict`] if a conflicting booking exists or is
    /// committed concurrently.
    async fn insert(&self, booking: NewBooking) -> Result<Booking>;

    /// Mark a booking paid with the given method. Idempotent: a booking that
    /// is already paid is left untouched and reported as
    /// [`PaidOutcome::AlreadyPaid`]. The paid flag is never cleared.
    async fn mark_paid(&self, id: BookingId, method: PaymentMethod) -> Result<PaidOutcome>;

    /// Fetch a booking by id.
    async fn get(&self, id: BookingId) -> Result<Option<Booking>>;

    /// All bookings owned by `user_id`, newest first.
    async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<Booking>>;

    /// All bookings for rooms of `hotel_id`, newest first.
    async fn list_for_hotel(&self, hotel_id: HotelId) -> Result<Vec<Booking>>;
}

/// Read-only access to rooms and hotels.
#[async_trait]
pub trait RoomStore: Send + Sync {
    /// Fetch a room by id.
    async fn get_room(&self, id: RoomId) -> Result<Option<Room>>;

    /// All rooms currently listed for booking.
    async fn list_rooms(&self) -> Result<Vec<Room>>;

    /// The hotel owned by `owner`, if any.
    async fn hotel_for_owner(&self, owner: &UserId) -> Result<Option<Hotel>>;
}

/// Persistence for identity-synced users.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert or update a user record.
    async fn upsert(&self, user: User) -> Result<()>;

    /// Remove a user record. Removing an absent user is not an error.
    async fn delete(&self, id: &UserId) -> Result<()>;

    /// Fetch a user by id.
    async fn get(&self, id: &UserId) -> Result<Option<User>>;

    /// Append a recently searched city, keeping at most the 3 newest.
    async fn push_recent_city(&self, id: &UserId, city: String) -> Result<()>;
}
