//! Domain types for the lodging booking system.
//!
//! Value objects and entities shared across the storage layer, the booking
//! services, and the API handlers. Serialized field names follow the
//! persisted contract read by dashboards and booking-history clients
//! (camelCase), so the serde renames here are part of the public interface.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ============================================================================
// Identifiers
// ============================================================================

/// Unique identifier for a booking
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BookingId(Uuid);

impl BookingId {
    /// Creates a new random `BookingId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `BookingId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for BookingId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BookingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a room
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoomId(Uuid);

impl RoomId {
    /// Creates a new random `RoomId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `RoomId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RoomId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a hotel
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HotelId(Uuid);

impl HotelId {
    /// Creates a new random `HotelId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `HotelId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for HotelId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for HotelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier for a user.
///
/// Issued by the external identity provider; opaque to this system, so it is
/// a string rather than a UUID.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(String);

impl UserId {
    /// Create a `UserId` from the provider-issued string
    #[must_use]
    pub const fn new(id: String) -> Self {
        Self(id)
    }

    /// The id as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

// ============================================================================
// Money (cents-based to avoid floating point errors)
// ============================================================================

/// Represents money in cents to avoid floating-point arithmetic errors
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Money(u64);

impl Money {
    /// Creates a `Money` value from cents
    #[must_use]
    pub const fn from_cents(cents: u64) -> Self {
        Self(cents)
    }

    /// Creates a `Money` value from dollars with overflow checking
    #[must_use]
    pub const fn checked_from_dollars(dollars: u64) -> Option<Self> {
        match dollars.checked_mul(100) {
            Some(cents) => Some(Self(cents)),
            None => None,
        }
    }

    /// Creates a `Money` value from dollars
    ///
    /// # Panics
    ///
    /// Panics if `dollars * 100` overflows. Use `checked_from_dollars` for a
    /// non-panicking conversion.
    #[must_use]
    #[allow(clippy::panic)]
    pub const fn from_dollars(dollars: u64) -> Self {
        match Self::checked_from_dollars(dollars) {
            Some(money) => money,
            None => panic!("Money::from_dollars overflow"),
        }
    }

    /// Returns the amount in cents
    #[must_use]
    pub const fn cents(&self) -> u64 {
        self.0
    }

    /// Returns the amount in whole dollars (rounded down)
    #[must_use]
    pub const fn dollars(&self) -> u64 {
        self.0 / 100
    }

    /// Multiplies by a quantity with overflow checking
    #[must_use]
    pub const fn checked_multiply(self, quantity: u32) -> Option<Self> {
        match self.0.checked_mul(quantity as u64) {
            Some(result) => Some(Self(result)),
            None => None,
        }
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}.{:02}", self.dollars(), self.0 % 100)
    }
}

// ============================================================================
// Stay dates
// ============================================================================

/// A validated check-in/check-out date pair with `check_in < check_out`.
///
/// Fields are private so [`StayDates::new`] is the only construction path
/// and the ordering invariant cannot be bypassed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StayDates {
    #[serde(rename = "checkInDate")]
    check_in: NaiveDate,
    #[serde(rename = "checkOutDate")]
    check_out: NaiveDate,
}

impl StayDates {
    /// Builds a `StayDates`, returning `None` unless `check_in < check_out`.
    #[must_use]
    pub fn new(check_in: NaiveDate, check_out: NaiveDate) -> Option<Self> {
        if check_in < check_out {
            Some(Self {
                check_in,
                check_out,
            })
        } else {
            None
        }
    }

    /// Check-in date (inclusive)
    #[must_use]
    pub const fn check_in(&self) -> NaiveDate {
        self.check_in
    }

    /// Check-out date
    #[must_use]
    pub const fn check_out(&self) -> NaiveDate {
        self.check_out
    }

    /// Number of billable nights: the whole-day difference, minimum 1.
    #[must_use]
    pub fn nights(&self) -> u32 {
        let days = (self.check_out - self.check_in).num_days();
        u32::try_from(days.max(1)).unwrap_or(u32::MAX)
    }

    /// Conservative overlap test used for availability.
    ///
    /// Intentionally inclusive on both bounds: an existing stay checking out
    /// on the day a new stay checks in counts as a conflict. Back-to-back
    /// turnover is blocked by policy, not treated as free.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.check_in <= other.check_out && self.check_out >= other.check_in
    }
}

impl fmt::Display for StayDates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.check_in, self.check_out)
    }
}

// ============================================================================
// Payment method
// ============================================================================

/// How a booking is (to be) paid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentMethod {
    /// Settled at the front desk; never transitions `is_paid` in this system
    PayAtHotel,
    /// Online payment through the card provider
    Stripe,
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PayAtHotel => write!(f, "PayAtHotel"),
            Self::Stripe => write!(f, "Stripe"),
        }
    }
}

impl PaymentMethod {
    /// Parse from the stored string form.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PayAtHotel" => Some(Self::PayAtHotel),
            "Stripe" => Some(Self::Stripe),
            _ => None,
        }
    }
}

// ============================================================================
// Entities
// ============================================================================

/// A persisted booking: a room committed to a guest for a date range.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    /// Unique booking identifier
    pub id: BookingId,
    /// Owning user
    #[serde(rename = "user")]
    pub user_id: UserId,
    /// Booked room
    #[serde(rename = "room")]
    pub room_id: RoomId,
    /// Hotel the room belongs to (denormalized for dashboard queries)
    #[serde(rename = "hotel")]
    pub hotel_id: HotelId,
    /// Check-in/check-out dates
    #[serde(flatten)]
    pub dates: StayDates,
    /// Number of guests (positive)
    #[serde(rename = "guestCount")]
    pub guest_count: u32,
    /// Price fixed at creation time; never recomputed
    #[serde(rename = "totalPrice")]
    pub total_price: Money,
    /// Selected payment method
    #[serde(rename = "paymentMethod")]
    pub payment_method: PaymentMethod,
    /// Whether payment has been confirmed; monotonic false→true
    #[serde(rename = "isPaid")]
    pub is_paid: bool,
    /// When the booking was created
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    /// When the booking was last modified
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

/// A room, consumed read-only by the booking core.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Room {
    /// Unique room identifier
    pub id: RoomId,
    /// Hotel that owns the room
    #[serde(rename = "hotel")]
    pub hotel_id: HotelId,
    /// Room type label (e.g. "Double Bed")
    #[serde(rename = "roomType")]
    pub room_type: String,
    /// Nightly rate
    #[serde(rename = "pricePerNight")]
    pub price_per_night: Money,
    /// Amenity labels
    pub amenities: Vec<String>,
    /// Image URLs
    pub images: Vec<String>,
    /// Whether the owner currently lists the room for booking
    #[serde(rename = "isListed")]
    pub is_listed: bool,
}

/// A hotel, consumed read-only by the booking core.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Hotel {
    /// Unique hotel identifier
    pub id: HotelId,
    /// Display name
    pub name: String,
    /// Street address
    pub address: String,
    /// City, used for search
    pub city: String,
    /// Contact phone
    pub contact: String,
    /// Owning user (identity-provider id)
    #[serde(rename = "owner")]
    pub owner_id: UserId,
}

/// User role within the platform.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum UserRole {
    /// Regular guest
    #[serde(rename = "user")]
    User,
    /// Hotel owner with access to the dashboard
    #[serde(rename = "hotelOwner")]
    HotelOwner,
}

/// A user record, synced from the identity provider.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Identity-provider-issued id
    pub id: UserId,
    /// Display name
    pub username: String,
    /// Email address
    pub email: String,
    /// Profile image URL
    pub image: String,
    /// Platform role
    pub role: UserRole,
    /// Most recent searched cities, newest last, capped at 3
    #[serde(rename = "recentSearchedCities")]
    pub recent_searched_cities: Vec<String>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn stay_dates_reject_inverted_range() {
        assert!(StayDates::new(date(2024, 6, 2), date(2024, 6, 1)).is_none());
        assert!(StayDates::new(date(2024, 6, 1), date(2024, 6, 1)).is_none());

        let valid = StayDates::new(date(2024, 6, 1), date(2024, 6, 2)).unwrap();
        assert_eq!(valid.check_in(), date(2024, 6, 1));
        assert_eq!(valid.check_out(), date(2024, 6, 2));
    }

    #[test]
    fn nights_is_day_difference_with_minimum_one() {
        let one = StayDates::new(date(2024, 6, 1), date(2024, 6, 2)).unwrap();
        assert_eq!(one.nights(), 1);

        let three = StayDates::new(date(2024, 6, 1), date(2024, 6, 4)).unwrap();
        assert_eq!(three.nights(), 3);
    }

    #[test]
    fn overlap_is_inclusive_on_both_bounds() {
        let existing = StayDates::new(date(2024, 7, 1), date(2024, 7, 5)).unwrap();

        // Straddles the existing checkout day
        let overlapping = StayDates::new(date(2024, 7, 4), date(2024, 7, 6)).unwrap();
        assert!(existing.overlaps(&overlapping));

        // Back-to-back: check-in on the existing checkout day still conflicts
        let back_to_back = StayDates::new(date(2024, 7, 5), date(2024, 7, 7)).unwrap();
        assert!(existing.overlaps(&back_to_back));

        // Clear of the range entirely
        let clear = StayDates::new(date(2024, 7, 6), date(2024, 7, 8)).unwrap();
        assert!(!existing.overlaps(&clear));
    }

    #[test]
    fn money_multiplication_checks_overflow() {
        let rate = Money::from_dollars(100);
        assert_eq!(rate.checked_multiply(3).unwrap(), Money::from_dollars(300));
        assert!(Money::from_cents(u64::MAX).checked_multiply(2).is_none());
    }

    #[test]
    fn booking_serializes_with_contract_field_names() {
        let dates = StayDates::new(date(2024, 6, 1), date(2024, 6, 2)).unwrap();
        let booking = Booking {
            id: BookingId::new(),
            user_id: UserId::from("user_1"),
            room_id: RoomId::new(),
            hotel_id: HotelId::new(),
            dates,
            guest_count: 2,
            total_price: Money::from_dollars(100),
            payment_method: PaymentMethod::PayAtHotel,
            is_paid: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let json = serde_json::to_value(&booking).unwrap();
        assert_eq!(json["checkInDate"], "2024-06-01");
        assert_eq!(json["checkOutDate"], "2024-06-02");
        assert_eq!(json["guestCount"], 2);
        assert_eq!(json["isPaid"], false);
        assert_eq!(json["paymentMethod"], "PayAtHotel");
    }
}
