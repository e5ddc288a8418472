//! End-to-end booking lifecycle against the in-memory backend: create,
//! race for the same dates, confirm payment through the webhook handler.

#![allow(clippy::unwrap_used)]

use chrono::{NaiveDate, Utc};
use lodging::booking::{BookingError, BookingRequest, BookingService};
use lodging::notify::ConsoleMailer;
use lodging::payments::webhook::{sign_payload, PaymentWebhook, WebhookOutcome};
use lodging::payments::{MockPaymentProvider, PaymentProvider};
use lodging::store::memory::MemoryStore;
use lodging::store::{BookingStore, PaidOutcome};
use lodging::types::{
    Hotel, HotelId, Money, PaymentMethod, Room, RoomId, StayDates, User, UserId, UserRole,
};
use std::sync::Arc;

const WEBHOOK_SECRET: &str = "whsec_test";

struct Fixture {
    store: Arc<MemoryStore>,
    provider: Arc<MockPaymentProvider>,
    service: BookingService,
    webhook: PaymentWebhook,
    room_id: RoomId,
    user: User,
}

async fn fixture(nightly_rate_dollars: u64) -> Fixture {
    let store = Arc::new(MemoryStore::new());
    let provider = MockPaymentProvider::shared();

    let owner = UserId::from("owner_1");
    let hotel = Hotel {
        id: HotelId::new(),
        name: "Harbor View".to_string(),
        address: "1 Quay St".to_string(),
        city: "Lisbon".to_string(),
        contact: "+351 000 000".to_string(),
        owner_id: owner,
    };
    let room = Room {
        id: RoomId::new(),
        hotel_id: hotel.id,
        room_type: "Double Bed".to_string(),
        price_per_night: Money::from_dollars(nightly_rate_dollars),
        amenities: vec!["Free WiFi".to_string()],
        images: Vec::new(),
        is_listed: true,
    };
    let user = User {
        id: UserId::from("user_1"),
        username: "Ada Lovelace".to_string(),
        email: "ada@example.com".to_string(),
        image: String::new(),
        role: UserRole::User,
        recent_searched_cities: Vec::new(),
    };
    let room_id = room.id;
    store.add_hotel(hotel).await;
    store.add_room(room).await;
    store.add_user(user.clone()).await;

    let service = BookingService::new(
        store.clone(),
        store.clone(),
        provider.clone(),
        Arc::new(ConsoleMailer),
    );
    let webhook = PaymentWebhook::new(WEBHOOK_SECRET, 300, provider.clone(), store.clone());

    Fixture {
        store,
        provider,
        service,
        webhook,
        room_id,
        user,
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

fn succeeded_event(intent: &str) -> String {
    format!(
        r#"{{"type":"payment_intent.succeeded","data":{{"object":{{"id":"{intent}"}}}}}}"#
    )
}

#[tokio::test]
async fn price_is_fixed_from_the_stored_rate() {
    let fx = fixture(100).await;

    let one_night = fx
        .service
        .create_booking(&fx.user, request(fx.room_id, date(2024, 6, 1), date(2024, 6, 2)))
        .await
        .unwrap();
    assert_eq!(one_night.total_price, Money::from_dollars(100));

    let three_nights = fx
        .service
        .create_booking(&fx.user, request(fx.room_id, date(2024, 8, 1), date(2024, 8, 4)))
        .await
        .unwrap();
    assert_eq!(three_nights.total_price, Money::from_dollars(300));
}

#[tokio::test]
async fn concurrent_overlapping_requests_admit_exactly_one() {
    let fx = fixture(100).await;
    let service = Arc::new(fx.service);

    let mut handles = Vec::new();
    for _ in 0..6 {
        let service = Arc::clone(&service);
        let user = fx.user.clone();
        let room_id = fx.room_id;
        handles.push(tokio::spawn(async move {
            service
                .create_booking(&user, request(room_id, date(2024, 7, 1), date(2024, 7, 5)))
                .await
        }));
    }

    let mut successes = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => successes += 1,
            Err(BookingError::RoomUnavailable) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    assert_eq!(successes, 1);

    let stay = StayDates::new(date(2024, 7, 1), date(2024, 7, 5)).unwrap();
    let stored = fx.store.find_overlapping(fx.room_id, stay).await.unwrap();
    assert_eq!(stored.len(), 1);
}

#[tokio::test]
async fn webhook_confirms_payment_exactly_once() {
    let fx = fixture(100).await;

    let booking = fx
        .service
        .create_booking(&fx.user, request(fx.room_id, date(2024, 6, 1), date(2024, 6, 3)))
        .await
        .unwrap();
    assert!(!booking.is_paid);

    let session = fx.service.create_checkout(&fx.user.id, booking.id).await.unwrap();
    let intent = session.payment_intent.unwrap();

    let payload = succeeded_event(&intent);
    let header = sign_payload(WEBHOOK_SECRET, payload.as_bytes(), Utc::now().timestamp());

    let first = fx.webhook.process(&header, payload.as_bytes()).await.unwrap();
    assert_eq!(
        first,
        WebhookOutcome::Confirmed {
            booking_id: booking.id,
            outcome: PaidOutcome::Updated,
        }
    );

    // Redelivery is acknowledged without changing anything
    let second = fx.webhook.process(&header, payload.as_bytes()).await.unwrap();
    assert_eq!(
        second,
        WebhookOutcome::Confirmed {
            booking_id: booking.id,
            outcome: PaidOutcome::AlreadyPaid,
        }
    );

    let stored = fx.store.get(booking.id).await.unwrap().unwrap();
    assert!(stored.is_paid);
    assert_eq!(stored.payment_method, PaymentMethod::Stripe);
}

#[tokio::test]
async fn bad_signature_mutates_nothing() {
    let fx = fixture(100).await;

    let booking = fx
        .service
        .create_booking(&fx.user, request(fx.room_id, date(2024, 6, 1), date(2024, 6, 3)))
        .await
        .unwrap();
    let session = fx.service.create_checkout(&fx.user.id, booking.id).await.unwrap();
    let intent = session.payment_intent.unwrap();

    let payload = succeeded_event(&intent);
    let header = sign_payload("whsec_wrong", payload.as_bytes(), Utc::now().timestamp());

    assert!(fx.webhook.process(&header, payload.as_bytes()).await.is_err());

    let stored = fx.store.get(booking.id).await.unwrap().unwrap();
    assert!(!stored.is_paid);
}

#[tokio::test]
async fn unknown_events_are_acknowledged_without_side_effects() {
    let fx = fixture(100).await;

    let payload = r#"{"type":"charge.refunded","data":{"object":{"id":"ch_1"}}}"#;
    let header = sign_payload(WEBHOOK_SECRET, payload.as_bytes(), Utc::now().timestamp());

    let outcome = fx.webhook.process(&header, payload.as_bytes()).await.unwrap();
    assert_eq!(
        outcome,
        WebhookOutcome::Ignored {
            event_type: "charge.refunded".to_string(),
        }
    );

    // Some event kinds carry objects without an id at all; they must still
    // be acknowledged rather than rejected as malformed
    let payload = r#"{"type":"balance.available","data":{"object":{"amount":100,"currency":"usd"}}}"#;
    let header = sign_payload(WEBHOOK_SECRET, payload.as_bytes(), Utc::now().timestamp());

    let outcome = fx.webhook.process(&header, payload.as_bytes()).await.unwrap();
    assert_eq!(
        outcome,
        WebhookOutcome::Ignored {
            event_type: "balance.available".to_string(),
        }
    );
}

#[tokio::test]
async fn pay_at_hotel_bookings_stay_unpaid() {
    let fx = fixture(100).await;

    let booking = fx
        .service
        .create_booking(&fx.user, request(fx.room_id, date(2024, 6, 1), date(2024, 6, 3)))
        .await
        .unwrap();

    // No webhook ever arrives for this booking
    let stored = fx.store.get(booking.id).await.unwrap().unwrap();
    assert!(!stored.is_paid);
    assert_eq!(stored.payment_method, PaymentMethod::PayAtHotel);
}

#[tokio::test]
async fn missing_session_is_an_error_after_verification() {
    let fx = fixture(100).await;

    // Intent the provider has never seen
    let payload = succeeded_event("pi_unknown");
    let header = sign_payload(WEBHOOK_SECRET, payload.as_bytes(), Utc::now().timestamp());

    let err = fx.webhook.process(&header, payload.as_bytes()).await.unwrap_err();
    assert!(err.to_string().contains("pi_unknown"));

    // The provider itself still answers lookups afterwards
    assert!(fx.provider.find_session_by_intent("pi_unknown").await.unwrap().is_none());
}
