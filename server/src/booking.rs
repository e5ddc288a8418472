//! Booking lifecycle.
//!
//! [`BookingService`] owns the create path: validate the request, price the
//! stay from the stored nightly rate, and hand the write to the store, whose
//! insert is atomic with respect to the no-overlap invariant. The total
//! price is fixed here once and never recomputed; client-supplied prices
//! are ignored.

use crate::availability::AvailabilityChecker;
use crate::notify::BookingMailer;
use crate::payments::{CheckoutRequest, CheckoutSession, PaymentError, PaymentProvider};
use crate::store::{BookingStore, NewBooking, RoomStore, StoreError};
use crate::types::{Booking, BookingId, Money, PaymentMethod, RoomId, StayDates, User, UserId};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// Booking flow error.
#[derive(Debug, Error)]
pub enum BookingError {
    /// Check-in is not strictly before check-out.
    #[error("check-in date must be before check-out date")]
    InvalidDateRange,
    /// Guest count must be positive.
    #[error("guest count must be at least 1")]
    InvalidGuestCount,
    /// The requested room does not exist or is not listed.
    #[error("room not found")]
    RoomNotFound,
    /// The room is already booked for an overlapping range.
    #[error("room is not available for the selected dates")]
    RoomUnavailable,
    /// The nightly rate times the stay length overflows.
    #[error("total price out of range")]
    PriceOverflow,
    /// The booking does not belong to the requesting user.
    #[error("booking not found")]
    BookingNotFound,
    /// The caller does not own a hotel.
    #[error("no hotel found for this account")]
    NoHotel,
    /// Storage failure.
    #[error(transparent)]
    Storage(#[from] StoreError),
    /// Payment provider failure.
    #[error(transparent)]
    Payment(#[from] PaymentError),
}

/// What a client submits to create a booking.
#[derive(Debug, Clone, Deserialize)]
pub struct BookingRequest {
    /// Room to book
    #[serde(rename = "room")]
    pub room_id: RoomId,
    /// Requested check-in date
    #[serde(rename = "checkInDate")]
    pub check_in: NaiveDate,
    /// Requested check-out date
    #[serde(rename = "checkOutDate")]
    pub check_out: NaiveDate,
    /// Number of guests
    #[serde(rename = "guestCount")]
    pub guest_count: u32,
    /// Selected payment method; defaults to settling at the hotel
    #[serde(rename = "paymentMethod", default = "default_payment_method")]
    pub payment_method: PaymentMethod,
}

const fn default_payment_method() -> PaymentMethod {
    PaymentMethod::PayAtHotel
}

/// Owner dashboard summary.
#[derive(Debug, Clone, Serialize)]
pub struct HotelDashboard {
    /// All bookings for the hotel, newest first
    pub bookings: Vec<Booking>,
    /// Booking count
    #[serde(rename = "totalBookings")]
    pub total_bookings: usize,
    /// Sum of booking prices, paid or not
    #[serde(rename = "totalRevenue")]
    pub total_revenue: Money,
}

/// Orchestrates the booking lifecycle.
pub struct BookingService {
    bookings: Arc<dyn BookingStore>,
    rooms: Arc<dyn RoomStore>,
    availability: AvailabilityChecker,
    payments: Arc<dyn PaymentProvider>,
    mailer: Arc<dyn BookingMailer>,
}

impl BookingService {
    /// Wire the service over its collaborators.
    #[must_use]
    pub fn new(
        bookings: Arc<dyn BookingStore>,
        rooms: Arc<dyn RoomStore>,
        payments: Arc<dyn PaymentProvider>,
        mailer: Arc<dyn BookingMailer>,
    ) -> Self {
        let availability = AvailabilityChecker::new(bookings.clone());
        Self {
            bookings,
            rooms,
            availability,
            payments,
            mailer,
        }
    }

    /// Validate a date pair.
    fn stay_dates(check_in: NaiveDate, check_out: NaiveDate) -> Result<StayDates, BookingError> {
        StayDates::new(check_in, check_out).ok_or(BookingError::InvalidDateRange)
    }

    /// Advisory availability for a room and date range.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::InvalidDateRange`] for an inverted range.
    pub async fn check_availability(
        &self,
        room_id: RoomId,
        check_in: NaiveDate,
        check_out: NaiveDate,
    ) -> Result<bool, BookingError> {
        let dates = Self::stay_dates(check_in, check_out)?;
        Ok(self.availability.is_available(room_id, dates).await)
    }

    /// Create a booking for `user`.
    ///
    /// The precheck is advisory; the store's insert closes the race, so a
    /// conflicting concurrent create surfaces as [`BookingError::RoomUnavailable`]
    /// here regardless of what the precheck saw. On success a confirmation
    /// mail is spawned and never awaited; delivery failure cannot affect the
    /// stored booking.
    ///
    /// # Errors
    ///
    /// See [`BookingError`].
    pub async fn create_booking(
        &self,
        user: &User,
        request: BookingRequest,
    ) -> Result<Booking, BookingError> {
        let dates = Self::stay_dates(request.check_in, request.check_out)?;
        if request.guest_count == 0 {
            return Err(BookingError::InvalidGuestCount);
        }

        let room = self
            .rooms
            .get_room(request.room_id)
            .await?
            .filter(|r| r.is_listed)
            .ok_or(BookingError::RoomNotFound)?;

        if !self.availability.is_available(room.id, dates).await {
            return Err(BookingError::RoomUnavailable);
        }

        let total_price = room
            .price_per_night
            .checked_multiply(dates.nights())
            .ok_or(BookingError::PriceOverflow)?;

        let booking = self
            .bookings
            .insert(NewBooking {
                user_id: user.id.clone(),
                room_id: room.id,
                hotel_id: room.hotel_id,
                dates,
                guest_count: request.guest_count,
                total_price,
                payment_method: request.payment_method,
            })
            .await
            .map_err(|e| match e {
                StoreError::OverlapConflict => BookingError::RoomUnavailable,
                other => BookingError::Storage(other),
            })?;

        tracing::info!(
            booking_id = %booking.id,
            room_id = %room.id,
            user_id = %user.id,
            %dates,
            total = %total_price,
            "booking created"
        );

        let mailer = self.mailer.clone();
        let mail_user = user.clone();
        let mail_booking = booking.clone();
        tokio::spawn(async move {
            if let Err(err) = mailer
                .send_confirmation(&mail_user, &mail_booking, &room)
                .await
            {
                tracing::warn!(booking_id = %mail_booking.id, error = %err, "confirmation mail failed");
            }
        });

        Ok(booking)
    }

    /// All bookings owned by `user_id`, newest first.
    ///
    /// # Errors
    ///
    /// Propagates storage failures.
    pub async fn bookings_for_user(&self, user_id: &UserId) -> Result<Vec<Booking>, BookingError> {
        Ok(self.bookings.list_for_user(user_id).await?)
    }

    /// Dashboard for the hotel owned by `owner`.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::NoHotel`] when the caller owns no hotel.
    pub async fn hotel_dashboard(&self, owner: &UserId) -> Result<HotelDashboard, BookingError> {
        let hotel = self
            .rooms
            .hotel_for_owner(owner)
            .await?
            .ok_or(BookingError::NoHotel)?;

        let bookings = self.bookings.list_for_hotel(hotel.id).await?;
        let total_revenue = bookings
            .iter()
            .fold(Money::from_cents(0), |acc, b| {
                Money::from_cents(acc.cents().saturating_add(b.total_price.cents()))
            });

        Ok(HotelDashboard {
            total_bookings: bookings.len(),
            total_revenue,
            bookings,
        })
    }

    /// Start a hosted checkout for an unpaid booking owned by `user_id`.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::BookingNotFound`] when the booking is absent
    /// or owned by someone else, [`BookingError::RoomNotFound`] if its room
    /// vanished, and propagates provider failures.
    pub async fn create_checkout(
        &self,
        user_id: &UserId,
        booking_id: BookingId,
    ) -> Result<CheckoutSession, BookingError> {
        let booking = self
            .bookings
            .get(booking_id)
            .await?
            .filter(|b| &b.user_id == user_id)
            .ok_or(BookingError::BookingNotFound)?;

        let room = self
            .rooms
            .get_room(booking.room_id)
            .await?
            .ok_or(BookingError::RoomNotFound)?;

        let session = self
            .payments
            .create_checkout_session(CheckoutRequest {
                booking_id: booking.id,
                description: format!("Hotel Booking - {}", room.room_type),
                amount: booking.total_price,
            })
            .await?;

        tracing::info!(booking_id = %booking.id, session_id = %session.id, "checkout session created");
        Ok(session)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::notify::ConsoleMailer;
    use crate::payments::MockPaymentProvider;
    use crate::store::memory::MemoryStore;
    use crate::types::{Hotel, HotelId, Room, UserRole};

    fn room(price_dollars: u64) -> Room {
        Room {
            id: RoomId::new(),
            hotel_id: HotelId::new(),
            room_type: "Double Bed".to_string(),
            price_per_night: Money::from_dollars(price_dollars),
            amenities: vec!["Free WiFi".to_string()],
            images: Vec::new(),
            is_listed: true,
        }
    }

    fn guest() -> User {
        User {
            id: UserId::from("user_1"),
            username: "Ada Lovelace".to_string(),
            email: "ada@example.com".to_string(),
            image: String::new(),
            role: UserRole::User,
            recent_searched_cities: Vec::new(),
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn request(room_id: RoomId, check_in: NaiveDate, check_out: NaiveDate) -> BookingRequest {
        BookingRequest {
            room_id,
            check_in,
            check_out,
            guest_count: 2,
            payment_method: PaymentMethod::PayAtHotel,
        }
    }

    async fn service_with_room(room: Room) -> (BookingService, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        store.add_room(room).await;
        let service = BookingService::new(
            store.clone(),
            store.clone(),
            MockPaymentProvider::shared(),
            Arc::new(ConsoleMailer),
        );
        (service, store)
    }

    #[tokio::test]
    async fn price_is_nights_times_stored_rate() {
        let room = room(100);
        let room_id = room.id;
        let (service, _) = service_with_room(room).await;

        let one_night = service
            .create_booking(&guest(), request(room_id, date(2024, 6, 1), date(2024, 6, 2)))
            .await
            .unwrap();
        assert_eq!(one_night.total_price, Money::from_dollars(100));
        assert!(!one_night.is_paid);

        let three_nights = service
            .create_booking(&guest(), request(room_id, date(2024, 8, 1), date(2024, 8, 4)))
            .await
            .unwrap();
        assert_eq!(three_nights.total_price, Money::from_dollars(300));
    }

    #[tokio::test]
    async fn rejects_invalid_dates_and_guest_counts() {
        let room = room(100);
        let room_id = room.id;
        let (service, _) = service_with_room(room).await;

        let inverted = service
            .create_booking(&guest(), request(room_id, date(2024, 6, 2), date(2024, 6, 1)))
            .await;
        assert!(matches!(inverted, Err(BookingError::InvalidDateRange)));

        let mut zero_guests = request(room_id, date(2024, 6, 1), date(2024, 6, 2));
        zero_guests.guest_count = 0;
        assert!(matches!(
            service.create_booking(&guest(), zero_guests).await,
            Err(BookingError::InvalidGuestCount)
        ));
    }

    #[tokio::test]
    async fn unknown_and_unlisted_rooms_are_not_found() {
        let mut unlisted = room(100);
        unlisted.is_listed = false;
        let unlisted_id = unlisted.id;
        let (service, _) = service_with_room(unlisted).await;

        assert!(matches!(
            service
                .create_booking(&guest(), request(RoomId::new(), date(2024, 6, 1), date(2024, 6, 2)))
                .await,
            Err(BookingError::RoomNotFound)
        ));
        assert!(matches!(
            service
                .create_booking(&guest(), request(unlisted_id, date(2024, 6, 1), date(2024, 6, 2)))
                .await,
            Err(BookingError::RoomNotFound)
        ));
    }

    #[tokio::test]
    async fn overlapping_create_reports_unavailable() {
        let room = room(100);
        let room_id = room.id;
        let (service, _) = service_with_room(room).await;

        service
            .create_booking(&guest(), request(room_id, date(2024, 7, 1), date(2024, 7, 5)))
            .await
            .unwrap();

        let conflict = service
            .create_booking(&guest(), request(room_id, date(2024, 7, 4), date(2024, 7, 6)))
            .await;
        assert!(matches!(conflict, Err(BookingError::RoomUnavailable)));
    }

    #[tokio::test]
    async fn checkout_requires_ownership() {
        let room = room(100);
        let room_id = room.id;
        let (service, _) = service_with_room(room).await;

        let booking = service
            .create_booking(&guest(), request(room_id, date(2024, 6, 1), date(2024, 6, 2)))
            .await
            .unwrap();

        let session = service
            .create_checkout(&UserId::from("user_1"), booking.id)
            .await
            .unwrap();
        assert!(session.url.is_some());

        let stranger = service
            .create_checkout(&UserId::from("user_2"), booking.id)
            .await;
        assert!(matches!(stranger, Err(BookingError::BookingNotFound)));
    }

    #[tokio::test]
    async fn dashboard_sums_revenue_over_all_bookings() {
        let store = Arc::new(MemoryStore::new());
        let owner = UserId::from("owner_1");
        let hotel = Hotel {
            id: HotelId::new(),
            name: "Harbor View".to_string(),
            address: "1 Quay St".to_string(),
            city: "Lisbon".to_string(),
            contact: "+351 000 000".to_string(),
            owner_id: owner.clone(),
        };
        let mut r = room(150);
        r.hotel_id = hotel.id;
        let room_id = r.id;
        store.add_hotel(hotel).await;
        store.add_room(r).await;

        let service = BookingService::new(
            store.clone(),
            store.clone(),
            MockPaymentProvider::shared(),
            Arc::new(ConsoleMailer),
        );

        service
            .create_booking(&guest(), request(room_id, date(2024, 6, 1), date(2024, 6, 3)))
            .await
            .unwrap();
        service
            .create_booking(&guest(), request(room_id, date(2024, 6, 10), date(2024, 6, 11)))
            .await
            .unwrap();

        let dashboard = service.hotel_dashboard(&owner).await.unwrap();
        assert_eq!(dashboard.total_bookings, 2);
        assert_eq!(dashboard.total_revenue, Money::from_dollars(450));

        assert!(matches!(
            service.hotel_dashboard(&UserId::from("owner_2")).await,
            Err(BookingError::NoHotel)
        ));
    }
}
