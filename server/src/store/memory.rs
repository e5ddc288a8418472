//! In-memory storage for tests and local runs.
//!
//! Bookings live in maps behind async `RwLock`s. The no-overlap invariant is
//! closed with a per-room `Mutex`: `insert` holds the room's lock across the
//! overlap check and the write, so concurrent inserts for the same room
//! serialize and at most one of two overlapping requests succeeds.

use super::{BookingStore, NewBooking, PaidOutcome, Result, RoomStore, StoreError, UserStore};
use crate::types::{
    Booking, BookingId, Hotel, HotelId, PaymentMethod, Room, RoomId, StayDates, User, UserId,
};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// In-memory implementation of all store traits.
#[derive(Default)]
pub struct MemoryStore {
    bookings: RwLock<HashMap<BookingId, Booking>>,
    rooms: RwLock<HashMap<RoomId, Room>>,
    hotels: RwLock<HashMap<HotelId, Hotel>>,
    users: RwLock<HashMap<UserId, User>>,
    room_locks: Mutex<HashMap<RoomId, Arc<Mutex<()>>>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a room.
    pub async fn add_room(&self, room: Room) {
        self.rooms.write().await.insert(room.id, room);
    }

    /// Seed a hotel.
    pub async fn add_hotel(&self, hotel: Hotel) {
        self.hotels.write().await.insert(hotel.id, hotel);
    }

    /// Seed a user.
    pub async fn add_user(&self, user: User) {
        self.users.write().await.insert(user.id.clone(), user);
    }

    async fn room_lock(&self, room_id: RoomId) -> Arc<Mutex<()>> {
        let mut locks = self.room_locks.lock().await;
        Arc::clone(locks.entry(room_id).or_default())
    }

    fn overlapping_in(
        bookings: &HashMap<BookingId, Booking>,
        room_id: RoomId,
        dates: StayDates,
    ) -> Vec<Booking> {
        let mut found: Vec<Booking> = bookings
            .values()
            .filter(|b| b.room_id == room_id && b.dates.overlaps(&dates))
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        found
    }
}

#[async_trait]
impl BookingStore for MemoryStore {
    async fn find_overlapping(&self, room_id: RoomId, dates: StayDates) -> Result<Vec<Booking>> {
        let bookings = self.bookings.read().await;
        Ok(Self::overlapping_in(&bookings, room_id, dates))
    }

    async fn insert(&self, new: NewBooking) -> Result<Booking> {
        // Held across check and write; this is the atomicity of the backend.
        let lock = self.room_lock(new.room_id).await;
        let _guard = lock.lock().await;

        let mut bookings = self.bookings.write().await;
        if !Self::overlapping_in(&bookings, new.room_id, new.dates).is_empty() {
            return Err(StoreError::OverlapConflict);
        }

        let now = Utc::now();
        let booking = Booking {
            id: BookingId::new(),
            user_id: new.user_id,
            room_id: new.room_id,
            hotel_id: new.hotel_id,
            dates: new.dates,
            guest_count: new.guest_count,
            total_price: new.total_price,
            payment_method: new.payment_method,
            is_paid: false,
            created_at: now,
            updated_at: now,
        };
        bookings.insert(booking.id, booking.clone());
        Ok(booking)
    }

    async fn mark_paid(&self, id: BookingId, method: PaymentMethod) -> Result<PaidOutcome> {
        let mut bookings = self.bookings.write().await;
        let booking = bookings.get_mut(&id).ok_or(StoreError::NotFound("booking"))?;

        if booking.is_paid {
            return Ok(PaidOutcome::AlreadyPaid);
        }

        booking.is_paid = true;
        booking.payment_method = method;
        booking.updated_at = Utc::now();
        Ok(PaidOutcome::Updated)
    }

    async fn get(&self, id: BookingId) -> Result<Option<Booking>> {
        Ok(self.bookings.read().await.get(&id).cloned())
    }

    async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<Booking>> {
        let bookings = self.bookings.read().await;
        let mut found: Vec<Booking> = bookings
            .values()
            .filter(|b| &b.user_id == user_id)
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(found)
    }

    async fn list_for_hotel(&self, hotel_id: HotelId) -> Result<Vec<Booking>> {
        let bookings = self.bookings.read().await;
        let mut found: Vec<Booking> = bookings
            .values()
            .filter(|b| b.hotel_id == hotel_id)
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(found)
    }
}

#[async_trait]
impl RoomStore for MemoryStore {
    async fn get_room(&self, id: RoomId) -> Result<Option<Room>> {
        Ok(self.rooms.read().await.get(&id).cloned())
    }

    async fn list_rooms(&self) -> Result<Vec<Room>> {
        let rooms = self.rooms.read().await;
        Ok(rooms.values().filter(|r| r.is_listed).cloned().collect())
    }

    async fn hotel_for_owner(&self, owner: &UserId) -> Result<Option<Hotel>> {
        let hotels = self.hotels.read().await;
        Ok(hotels.values().find(|h| &h.owner_id == owner).cloned())
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn upsert(&self, user: User) -> Result<()> {
        let mut users = self.users.write().await;
        match users.get_mut(&user.id) {
            Some(existing) => {
                existing.username = user.username;
                existing.email = user.email;
                existing.image = user.image;
            }
            None => {
                users.insert(user.id.clone(), user);
            }
        }
        Ok(())
    }

    async fn delete(&self, id: &UserId) -> Result<()> {
        self.users.write().await.remove(id);
        Ok(())
    }

    async fn get(&self, id: &UserId) -> Result<Option<User>> {
        Ok(self.users.read().await.get(id).cloned())
    }

    async fn push_recent_city(&self, id: &UserId, city: String) -> Result<()> {
        let mut users = self.users.write().await;
        let user = users.get_mut(id).ok_or(StoreError::NotFound("user"))?;
        user.recent_searched_cities.push(city);
        let len = user.recent_searched_cities.len();
        if len > 3 {
            user.recent_searched_cities.drain(..len - 3);
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::Money;
    use chrono::NaiveDate;

    fn dates(from: (i32, u32, u32), to: (i32, u32, u32)) -> StayDates {
        StayDates::new(
            NaiveDate::from_ymd_opt(from.0, from.1, from.2).unwrap(),
            NaiveDate::from_ymd_opt(to.0, to.1, to.2).unwrap(),
        )
        .unwrap()
    }

    fn new_booking(room_id: RoomId, stay: StayDates) -> NewBooking {
        NewBooking {
            user_id: UserId::from("user_1"),
            room_id,
            hotel_id: HotelId::new(),
            dates: stay,
            guest_count: 2,
            total_price: Money::from_dollars(100),
            payment_method: PaymentMethod::PayAtHotel,
        }
    }

    #[tokio::test]
    async fn insert_rejects_overlapping_booking() {
        let store = MemoryStore::new();
        let room = RoomId::new();

        store
            .insert(new_booking(room, dates((2024, 7, 1), (2024, 7, 5))))
            .await
            .unwrap();

        let err = store
            .insert(new_booking(room, dates((2024, 7, 4), (2024, 7, 6))))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::OverlapConflict));

        // Different room is unaffected
        store
            .insert(new_booking(RoomId::new(), dates((2024, 7, 4), (2024, 7, 6))))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn concurrent_overlapping_inserts_admit_exactly_one() {
        let store = Arc::new(MemoryStore::new());
        let room = RoomId::new();
        let stay = dates((2024, 7, 1), (2024, 7, 5));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store.insert(new_booking(room, stay)).await
            }));
        }

        let mut successes = 0;
        let mut conflicts = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => successes += 1,
                Err(StoreError::OverlapConflict) => conflicts += 1,
                Err(other) => panic!("unexpected error: {other}"),
            }
        }
        assert_eq!(successes, 1);
        assert_eq!(conflicts, 7);
    }

    #[tokio::test]
    async fn mark_paid_is_idempotent_and_monotonic() {
        let store = MemoryStore::new();
        let room = RoomId::new();
        let booking = store
            .insert(new_booking(room, dates((2024, 7, 1), (2024, 7, 3))))
            .await
            .unwrap();
        assert!(!booking.is_paid);

        let first = store.mark_paid(booking.id, PaymentMethod::Stripe).await.unwrap();
        assert_eq!(first, PaidOutcome::Updated);

        let second = store.mark_paid(booking.id, PaymentMethod::Stripe).await.unwrap();
        assert_eq!(second, PaidOutcome::AlreadyPaid);

        let stored = BookingStore::get(&store, booking.id).await.unwrap().unwrap();
        assert!(stored.is_paid);
        assert_eq!(stored.payment_method, PaymentMethod::Stripe);
    }

    #[tokio::test]
    async fn recent_cities_keep_newest_three() {
        let store = MemoryStore::new();
        let user = User {
            id: UserId::from("user_1"),
            username: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            image: String::new(),
            role: crate::types::UserRole::User,
            recent_searched_cities: Vec::new(),
        };
        store.add_user(user).await;

        let id = UserId::from("user_1");
        for city in ["Paris", "Rome", "Tokyo", "Lagos"] {
            store.push_recent_city(&id, city.to_string()).await.unwrap();
        }

        let stored = UserStore::get(&store, &id).await.unwrap().unwrap();
        assert_eq!(stored.recent_searched_cities, vec!["Rome", "Tokyo", "Lagos"]);
    }
}
