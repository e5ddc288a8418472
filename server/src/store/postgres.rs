//! PostgreSQL-backed storage.
//!
//! One pool serves all three store traits. The no-overlap invariant is
//! enforced inside the database: the `bookings` table carries a gist
//! exclusion constraint over `(room_id, daterange(check_in, check_out,
//! '[]'))`, so the overlap check and the insert are a single atomic
//! operation regardless of how many writers race. An exclusion violation
//! (SQLSTATE 23P01) surfaces as [`StoreError::OverlapConflict`].

use super::{BookingStore, NewBooking, PaidOutcome, Result, RoomStore, StoreError, UserStore};
use crate::types::{
    Booking, BookingId, Hotel, HotelId, Money, PaymentMethod, Room, RoomId, StayDates, User,
    UserId, UserRole,
};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;
use uuid::Uuid;

/// SQLSTATE for an exclusion constraint violation.
const EXCLUSION_VIOLATION: &str = "23P01";

/// PostgreSQL implementation of all store traits.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Wrap an existing connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying pool (used for health checks).
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Raw booking row as selected from the database.
type BookingRow = (
    Uuid,
    String,
    Uuid,
    Uuid,
    NaiveDate,
    NaiveDate,
    i32,
    i64,
    String,
    bool,
    DateTime<Utc>,
    DateTime<Utc>,
);

const BOOKING_COLUMNS: &str = "id, user_id, room_id, hotel_id, check_in, check_out, \
     guest_count, total_price_cents, payment_method, is_paid, created_at, updated_at";

fn booking_from_row(row: BookingRow) -> Result<Booking> {
    let (
        id,
        user_id,
        room_id,
        hotel_id,
        check_in,
        check_out,
        guest_count,
        total_price_cents,
        payment_method,
        is_paid,
        created_at,
        updated_at,
    ) = row;

    let dates = StayDates::new(check_in, check_out)
        .ok_or_else(|| StoreError::Backend(format!("booking {id} has an inverted date range")))?;
    let payment_method = PaymentMethod::parse(&payment_method).ok_or_else(|| {
        StoreError::Backend(format!("booking {id} has unknown payment method {payment_method}"))
    })?;
    let guest_count = u32::try_from(guest_count)
        .map_err(|_| StoreError::Backend(format!("booking {id} has negative guest count")))?;
    let total_price = u64::try_from(total_price_cents)
        .map_err(|_| StoreError::Backend(format!("booking {id} has negative price")))?;

    Ok(Booking {
        id: BookingId::from_uuid(id),
        user_id: UserId::new(user_id),
        room_id: RoomId::from_uuid(room_id),
        hotel_id: HotelId::from_uuid(hotel_id),
        dates,
        guest_count,
        total_price: Money::from_cents(total_price),
        payment_method,
        is_paid,
        created_at,
        updated_at,
    })
}

#[async_trait]
impl BookingStore for PostgresStore {
    async fn find_overlapping(&self, room_id: RoomId, dates: StayDates) -> Result<Vec<Booking>> {
        let rows: Vec<BookingRow> = sqlx::query_as(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings
             WHERE room_id = $1 AND check_in <= $3 AND check_out >= $2"
        ))
        .bind(room_id.as_uuid())
        .bind(dates.check_in())
        .bind(dates.check_out())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(booking_from_row).collect()
    }

    async fn insert(&self, booking: NewBooking) -> Result<Booking> {
        let id = BookingId::new();
        let guest_count = i32::try_from(booking.guest_count)
            .map_err(|_| StoreError::Backend("guest count out of range".to_string()))?;
        let total_price_cents = i64::try_from(booking.total_price.cents())
            .map_err(|_| StoreError::Backend("price out of range".to_string()))?;

        let row: BookingRow = sqlx::query_as(&format!(
            "INSERT INTO bookings
                 (id, user_id, room_id, hotel_id, check_in, check_out,
                  guest_count, total_price_cents, payment_method, is_paid)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, FALSE)
             RETURNING {BOOKING_COLUMNS}"
        ))
        .bind(id.as_uuid())
        .bind(booking.user_id.as_str())
        .bind(booking.room_id.as_uuid())
        .bind(booking.hotel_id.as_uuid())
        .bind(booking.dates.check_in())
        .bind(booking.dates.check_out())
        .bind(guest_count)
        .bind(total_price_cents)
        .bind(booking.payment_method.to_string())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.code().as_deref() == Some(EXCLUSION_VIOLATION) => {
                StoreError::OverlapConflict
            }
            _ => StoreError::from(e),
        })?;

        booking_from_row(row)
    }

    async fn mark_paid(&self, id: BookingId, method: PaymentMethod) -> Result<PaidOutcome> {
        // Guarded update keeps the transition monotonic and idempotent.
        let updated = sqlx::query(
            "UPDATE bookings
             SET is_paid = TRUE, payment_method = $2, updated_at = now()
             WHERE id = $1 AND is_paid = FALSE",
        )
        .bind(id.as_uuid())
        .bind(method.to_string())
        .execute(&self.pool)
        .await?
        .rows_affected();

        if updated == 1 {
            return Ok(PaidOutcome::Updated);
        }

        let exists: Option<(bool,)> = sqlx::query_as("SELECT is_paid FROM bookings WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        match exists {
            Some((true,)) => Ok(PaidOutcome::AlreadyPaid),
            Some((false,)) => Err(StoreError::Backend(
                "guarded paid update matched no row for an unpaid booking".to_string(),
            )),
            None => Err(StoreError::NotFound("booking")),
        }
    }

    async fn get(&self, id: BookingId) -> Result<Option<Booking>> {
        let row: Option<BookingRow> =
            sqlx::query_as(&format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = $1"))
                .bind(id.as_uuid())
                .fetch_optional(&self.pool)
                .await?;

        row.map(booking_from_row).transpose()
    }

    async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<Booking>> {
        let rows: Vec<BookingRow> = sqlx::query_as(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings
             WHERE user_id = $1 ORDER BY created_at DESC"
        ))
        .bind(user_id.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(booking_from_row).collect()
    }

    async fn list_for_hotel(&self, hotel_id: HotelId) -> Result<Vec<Booking>> {
        let rows: Vec<BookingRow> = sqlx::query_as(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings
             WHERE hotel_id = $1 ORDER BY created_at DESC"
        ))
        .bind(hotel_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(booking_from_row).collect()
    }
}

/// Raw room row as selected from the database.
type RoomRow = (Uuid, Uuid, String, i64, Vec<String>, Vec<String>, bool);

const ROOM_COLUMNS: &str =
    "id, hotel_id, room_type, price_per_night_cents, amenities, images, is_listed";

fn room_from_row(row: RoomRow) -> Result<Room> {
    let (id, hotel_id, room_type, price_cents, amenities, images, is_listed) = row;
    let price = u64::try_from(price_cents)
        .map_err(|_| StoreError::Backend(format!("room {id} has negative price")))?;

    Ok(Room {
        id: RoomId::from_uuid(id),
        hotel_id: HotelId::from_uuid(hotel_id),
        room_type,
        price_per_night: Money::from_cents(price),
        amenities,
        images,
        is_listed,
    })
}

#[async_trait]
impl RoomStore for PostgresStore {
    async fn get_room(&self, id: RoomId) -> Result<Option<Room>> {
        let row: Option<RoomRow> =
            sqlx::query_as(&format!("SELECT {ROOM_COLUMNS} FROM rooms WHERE id = $1"))
                .bind(id.as_uuid())
                .fetch_optional(&self.pool)
                .await?;

        row.map(room_from_row).transpose()
    }

    async fn list_rooms(&self) -> Result<Vec<Room>> {
        let rows: Vec<RoomRow> = sqlx::query_as(&format!(
            "SELECT {ROOM_COLUMNS} FROM rooms WHERE is_listed ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(room_from_row).collect()
    }

    async fn hotel_for_owner(&self, owner: &UserId) -> Result<Option<Hotel>> {
        let row: Option<(Uuid, String, String, String, String, String)> = sqlx::query_as(
            "SELECT id, name, address, city, contact, owner_id FROM hotels WHERE owner_id = $1",
        )
        .bind(owner.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(id, name, address, city, contact, owner_id)| Hotel {
            id: HotelId::from_uuid(id),
            name,
            address,
            city,
            contact,
            owner_id: UserId::new(owner_id),
        }))
    }
}

fn role_to_str(role: UserRole) -> &'static str {
    match role {
        UserRole::User => "user",
        UserRole::HotelOwner => "hotelOwner",
    }
}

fn role_from_str(s: &str) -> Result<UserRole> {
    match s {
        "user" => Ok(UserRole::User),
        "hotelOwner" => Ok(UserRole::HotelOwner),
        other => Err(StoreError::Backend(format!("unknown user role {other}"))),
    }
}

#[async_trait]
impl UserStore for PostgresStore {
    async fn upsert(&self, user: User) -> Result<()> {
        sqlx::query(
            "INSERT INTO users (id, username, email, image, role, recent_search_cities)
             VALUES ($1, $2, $3, $4, $5, $6)
             ON CONFLICT (id) DO UPDATE
                 SET username = EXCLUDED.username,
                     email = EXCLUDED.email,
                     image = EXCLUDED.image,
                     updated_at = now()",
        )
        .bind(user.id.as_str())
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.image)
        .bind(role_to_str(user.role))
        .bind(&user.recent_searched_cities)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete(&self, id: &UserId) -> Result<()> {
        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id.as_str())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn get(&self, id: &UserId) -> Result<Option<User>> {
        let row: Option<(String, String, String, String, String, Vec<String>)> = sqlx::query_as(
            "SELECT id, username, email, image, role, recent_search_cities
             FROM users WHERE id = $1",
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some((id, username, email, image, role, recent_searched_cities)) => Ok(Some(User {
                id: UserId::new(id),
                username,
                email,
                image,
                role: role_from_str(&role)?,
                recent_searched_cities,
            })),
            None => Ok(None),
        }
    }

    async fn push_recent_city(&self, id: &UserId, city: String) -> Result<()> {
        // Append then keep the newest three, all in one statement.
        let updated = sqlx::query(
            "UPDATE users
             SET recent_search_cities = (
                     SELECT ARRAY(
                         SELECT c FROM unnest(array_append(recent_search_cities, $2))
                             WITH ORDINALITY AS t(c, ord)
                         ORDER BY ord
                         OFFSET greatest(cardinality(array_append(recent_search_cities, $2)) - 3, 0)
                     )
                 ),
                 updated_at = now()
             WHERE id = $1",
        )
        .bind(id.as_str())
        .bind(&city)
        .execute(&self.pool)
        .await?
        .rows_affected();

        if updated == 0 {
            return Err(StoreError::NotFound("user"));
        }

        Ok(())
    }
}
