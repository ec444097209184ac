use std::sync::Arc;

use aquaglow_bookings::{
    dto::bookings::{
        CancelBookingRequest, CreateBookingRequest, UpdatePaymentRequest, UpdateStatusRequest,
    },
    error::{AppError, Conflict},
    models::{BookingDetail, BookingStatus, PaymentStatus, ServiceCategory},
    routes::params::{BookingListQuery, CustomerListQuery},
    services::{booking_service, customer_service},
    state::AppState,
    store::{MemoryStore, NewService, Store},
};
use chrono::NaiveDate;
use rust_decimal_macros::dec;
use uuid::Uuid;

fn day(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn booking_day() -> NaiveDate {
    day("2030-01-01")
}

async fn setup() -> (Arc<MemoryStore>, AppState) {
    let store = Arc::new(MemoryStore::new());
    store
        .create_service(NewService {
            name: "Full Detail".into(),
            description: "Complete interior and exterior detail".into(),
            base_price: dec!(1200.00),
            duration: 180,
            vehicle_types: vec![],
            category: ServiceCategory::Premium,
            features: vec![],
            image_url: None,
            active: true,
        })
        .await
        .unwrap();
    let state = AppState::new(store.clone());
    (store, state)
}

fn request(email: &str, date: &str, time: &str) -> CreateBookingRequest {
    CreateBookingRequest {
        customer_name: Some("Jane Doe".into()),
        customer_email: Some(email.into()),
        customer_phone: Some("+27 82 555 0100".into()),
        date: Some(date.into()),
        time: Some(time.into()),
        service_type: Some("Full Detail".into()),
        vehicle_type: Some("SUV".into()),
        condition: Some("MODERATE".into()),
        extras: vec!["ENGINE".into()],
        appointment_type: Some("studio".into()),
        ..Default::default()
    }
}

async fn book(state: &AppState, email: &str, date: &str, time: &str) -> BookingDetail {
    booking_service::create_booking_on(state, request(email, date, time), booking_day())
        .await
        .unwrap()
        .data
        .unwrap()
}

async fn set_payment(state: &AppState, id: Uuid, status: &str) {
    booking_service::update_payment_status(
        state,
        id,
        UpdatePaymentRequest {
            payment_status: status.into(),
            payment_method: Some("card".into()),
        },
    )
    .await
    .unwrap();
}

async fn set_status(state: &AppState, id: Uuid, status: &str) -> Result<(), AppError> {
    booking_service::update_booking_status(
        state,
        id,
        UpdateStatusRequest {
            status: status.into(),
            notes: None,
        },
    )
    .await
    .map(|_| ())
}

#[tokio::test]
async fn full_detail_booking_is_priced_and_pending() {
    let (store, state) = setup().await;
    let detail = book(&state, "jane@example.com", "2030-01-15", "09:00 AM").await;

    assert_eq!(detail.booking.total_price, dec!(2172.00));
    assert_eq!(detail.booking.status, BookingStatus::Pending);
    assert_eq!(detail.booking.payment_status, PaymentStatus::Pending);
    assert!(detail.booking.reference_number.starts_with("AG-"));
    assert_eq!(detail.customer.email, "jane@example.com");
    assert_eq!(detail.customer.loyalty_points, 0);
    assert_eq!(detail.customer.total_spent, dec!(0));

    let audit = store.audit_entries().await;
    assert_eq!(audit.len(), 1);
    assert_eq!(audit[0].action, "booking_created");
    assert_eq!(audit[0].resource_id, Some(detail.booking.id));
}

#[tokio::test]
async fn returning_customer_is_matched_by_email_case_insensitively() {
    let (_store, state) = setup().await;
    let first = book(&state, "jane@example.com", "2030-01-15", "09:00 AM").await;
    let second = book(&state, "JANE@Example.COM", "2030-01-15", "11:00 AM").await;

    assert_eq!(first.customer.id, second.customer.id);
    assert_ne!(
        first.booking.reference_number,
        second.booking.reference_number
    );
}

#[tokio::test]
async fn unknown_service_creates_nothing() {
    let (store, state) = setup().await;
    let payload = CreateBookingRequest {
        service_type: Some("Moon Polish".into()),
        ..request("ghost@example.com", "2030-01-15", "09:00 AM")
    };

    let err = booking_service::create_booking_on(&state, payload, booking_day())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::ServiceNotFound(name) if name == "Moon Polish"));
    assert!(
        store
            .find_customer_by_email("ghost@example.com")
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn cancelling_twice_fails_with_already_cancelled() {
    let (_store, state) = setup().await;
    let detail = book(&state, "jane@example.com", "2030-01-15", "09:00 AM").await;

    let cancelled = booking_service::cancel_booking(
        &state,
        detail.booking.id,
        CancelBookingRequest {
            reason: Some("customer request".into()),
        },
    )
    .await
    .unwrap()
    .data
    .unwrap();
    assert_eq!(cancelled.booking.status, BookingStatus::Cancelled);
    assert!(
        cancelled
            .booking
            .notes
            .as_deref()
            .unwrap()
            .contains("customer request")
    );

    let err = booking_service::cancel_booking(
        &state,
        detail.booking.id,
        CancelBookingRequest::default(),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::AlreadyCancelled));
}

#[tokio::test]
async fn paying_a_pending_booking_confirms_it() {
    let (_store, state) = setup().await;
    let detail = book(&state, "jane@example.com", "2030-01-15", "09:00 AM").await;

    let transition = booking_service::update_payment_status(
        &state,
        detail.booking.id,
        UpdatePaymentRequest {
            payment_status: "paid".into(),
            payment_method: Some("cash".into()),
        },
    )
    .await
    .unwrap()
    .data
    .unwrap();

    assert_eq!(transition.previous_status, BookingStatus::Pending);
    assert_eq!(transition.status, BookingStatus::Confirmed);
    assert_eq!(transition.payment_status, PaymentStatus::Paid);
    assert!(transition.status_changed());
}

#[tokio::test]
async fn paying_a_confirmed_booking_keeps_it_confirmed() {
    let (_store, state) = setup().await;
    let detail = book(&state, "jane@example.com", "2030-01-15", "09:00 AM").await;
    set_status(&state, detail.booking.id, "confirmed").await.unwrap();
    set_payment(&state, detail.booking.id, "failed").await;
    set_payment(&state, detail.booking.id, "paid").await;

    let booking = booking_service::get_booking(&state, detail.booking.id)
        .await
        .unwrap()
        .data
        .unwrap()
        .booking;
    assert_eq!(booking.status, BookingStatus::Confirmed);
    assert_eq!(booking.payment_status, PaymentStatus::Paid);
}

#[tokio::test]
async fn completing_a_paid_booking_awards_loyalty_once() {
    let (store, state) = setup().await;
    let detail = book(&state, "jane@example.com", "2030-01-15", "09:00 AM").await;
    set_payment(&state, detail.booking.id, "paid").await;
    set_status(&state, detail.booking.id, "completed").await.unwrap();

    let customer = store
        .find_customer(detail.customer.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(customer.loyalty_points, 21);
    assert_eq!(customer.total_spent, dec!(2172.00));

    let err = set_status(&state, detail.booking.id, "completed")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidTransition { .. }));

    let customer = store
        .find_customer(detail.customer.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(customer.loyalty_points, 21);
    assert_eq!(customer.total_spent, dec!(2172.00));
}

#[tokio::test]
async fn completing_an_unpaid_booking_awards_nothing() {
    let (store, state) = setup().await;
    let detail = book(&state, "jane@example.com", "2030-01-15", "09:00 AM").await;
    set_status(&state, detail.booking.id, "completed").await.unwrap();

    let customer = store
        .find_customer(detail.customer.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(customer.loyalty_points, 0);
    assert_eq!(customer.total_spent, dec!(0));
}

#[tokio::test]
async fn terminal_bookings_reject_every_change() {
    let (_store, state) = setup().await;
    let detail = book(&state, "jane@example.com", "2030-01-15", "09:00 AM").await;
    set_status(&state, detail.booking.id, "completed").await.unwrap();

    for status in ["pending", "confirmed"] {
        let err = set_status(&state, detail.booking.id, status)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidTransition { .. }));
    }
    let err = booking_service::cancel_booking(
        &state,
        detail.booking.id,
        CancelBookingRequest::default(),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::CannotCancelCompleted));
}

#[tokio::test]
async fn confirmed_bookings_cannot_go_back_to_pending() {
    let (_store, state) = setup().await;
    let detail = book(&state, "jane@example.com", "2030-01-15", "09:00 AM").await;
    set_status(&state, detail.booking.id, "confirmed").await.unwrap();
    set_status(&state, detail.booking.id, "confirmed").await.unwrap();

    let err = set_status(&state, detail.booking.id, "pending")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AppError::InvalidTransition {
            from: BookingStatus::Confirmed,
            to: BookingStatus::Pending
        }
    ));
}

#[tokio::test]
async fn held_slots_are_removed_from_availability() {
    let (_store, state) = setup().await;
    book(&state, "a@example.com", "2030-01-15", "09:00 AM").await;
    let afternoon = book(&state, "b@example.com", "2030-01-15", "03:00 PM").await;
    book(&state, "c@example.com", "2030-01-16", "11:00 AM").await;

    let slots = booking_service::available_slots(&state, Some("2030-01-15"))
        .await
        .unwrap()
        .data
        .unwrap();
    assert_eq!(slots.booked_slots, vec!["09:00 AM", "03:00 PM"]);
    assert_eq!(
        slots.available_slots,
        vec!["11:00 AM", "01:00 PM", "05:00 PM"]
    );
    assert_eq!(slots.total_slots, 5);
    assert_eq!(slots.available_count, 3);

    booking_service::cancel_booking(
        &state,
        afternoon.booking.id,
        CancelBookingRequest::default(),
    )
    .await
    .unwrap();
    let slots = booking_service::available_slots(&state, Some("2030-01-15"))
        .await
        .unwrap()
        .data
        .unwrap();
    assert_eq!(slots.booked_slots, vec!["09:00 AM"]);
}

#[tokio::test]
async fn a_held_slot_cannot_be_booked_twice() {
    let (_store, state) = setup().await;
    book(&state, "a@example.com", "2030-01-15", "09:00 AM").await;

    let err = booking_service::create_booking_on(
        &state,
        request("b@example.com", "2030-01-15", "09:00 am"),
        booking_day(),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Conflict(Conflict::Slot)));
}

#[tokio::test]
async fn stats_follow_the_calendar_window() {
    let (_store, state) = setup().await;
    let before_week = book(&state, "a@example.com", "2030-01-05", "09:00 AM").await;
    let monday = book(&state, "b@example.com", "2030-01-14", "09:00 AM").await;
    book(&state, "c@example.com", "2030-01-15", "09:00 AM").await;
    let next_week = book(&state, "d@example.com", "2030-01-20", "09:00 AM").await;

    set_payment(&state, monday.booking.id, "paid").await;
    set_status(&state, monday.booking.id, "completed").await.unwrap();
    // completed but never paid: not revenue
    set_status(&state, before_week.booking.id, "completed").await.unwrap();
    booking_service::cancel_booking(&state, next_week.booking.id, CancelBookingRequest::default())
        .await
        .unwrap();

    // 2030-01-15 is a Tuesday; the week started on Sunday 2030-01-13
    let stats = booking_service::booking_stats_on(&state, day("2030-01-15"))
        .await
        .unwrap()
        .data
        .unwrap();
    assert_eq!(stats.total_bookings, 4);
    assert_eq!(stats.pending_bookings, 1);
    assert_eq!(stats.confirmed_bookings, 0);
    assert_eq!(stats.completed_bookings, 2);
    assert_eq!(stats.cancelled_bookings, 1);
    assert_eq!(stats.monthly_revenue, dec!(2172.00));
    assert_eq!(stats.weekly_bookings, 3);
    assert_eq!(stats.today_bookings, 1);
}

#[tokio::test]
async fn bookings_list_filters_and_orders_by_date() {
    let (_store, state) = setup().await;
    book(&state, "a@example.com", "2030-01-10", "09:00 AM").await;
    book(&state, "a@example.com", "2030-01-20", "09:00 AM").await;
    let other = book(&state, "b@example.com", "2030-01-15", "09:00 AM").await;
    booking_service::cancel_booking(&state, other.booking.id, CancelBookingRequest::default())
        .await
        .unwrap();

    let resp = booking_service::list_bookings(
        &state,
        BookingListQuery {
            customer_email: Some("A@example.com".into()),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    let dates: Vec<NaiveDate> = resp
        .data
        .unwrap()
        .items
        .iter()
        .map(|d| d.booking.date)
        .collect();
    assert_eq!(dates, vec![day("2030-01-20"), day("2030-01-10")]);
    assert_eq!(resp.meta.unwrap().total, Some(2));

    let resp = booking_service::list_bookings(
        &state,
        BookingListQuery {
            status: Some("cancelled".into()),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    let items = resp.data.unwrap().items;
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].customer.email, "b@example.com");

    let resp = booking_service::list_bookings(
        &state,
        BookingListQuery {
            date_from: Some("2030-01-11".into()),
            date_to: Some("2030-01-15".into()),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(resp.data.unwrap().items.len(), 1);

    let resp = booking_service::list_bookings(
        &state,
        BookingListQuery {
            customer_email: Some("nobody@example.com".into()),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert!(resp.data.unwrap().items.is_empty());
}

#[tokio::test]
async fn out_of_range_pages_are_empty() {
    let (_store, state) = setup().await;
    book(&state, "jane@example.com", "2030-01-10", "09:00 AM").await;

    let resp = booking_service::list_bookings(
        &state,
        BookingListQuery {
            page: Some(u64::MAX),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert!(resp.data.unwrap().items.is_empty());
    let meta = resp.meta.unwrap();
    assert_eq!(meta.page, Some(u64::MAX));
    assert_eq!(meta.total, Some(1));

    let resp = customer_service::list_customers(
        &state,
        CustomerListQuery {
            page: Some(u64::MAX),
            per_page: Some(100),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert!(resp.data.unwrap().items.is_empty());
}

#[tokio::test]
async fn customer_search_treats_wildcards_literally() {
    let (_store, state) = setup().await;
    book(&state, "jane@example.com", "2030-01-10", "09:00 AM").await;

    let resp = customer_service::list_customers(
        &state,
        CustomerListQuery {
            search: Some("%".into()),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert!(resp.data.unwrap().items.is_empty());

    let resp = customer_service::list_customers(
        &state,
        CustomerListQuery {
            search: Some("jane@".into()),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(resp.data.unwrap().items.len(), 1);
}

#[tokio::test]
async fn customer_stats_reflect_completed_spend() {
    let (_store, state) = setup().await;
    let first = book(&state, "jane@example.com", "2030-01-10", "09:00 AM").await;
    let second = book(&state, "jane@example.com", "2030-01-12", "09:00 AM").await;
    book(&state, "jane@example.com", "2030-01-14", "09:00 AM").await;

    for id in [first.booking.id, second.booking.id] {
        set_payment(&state, id, "paid").await;
        set_status(&state, id, "completed").await.unwrap();
    }

    let stats = customer_service::customer_stats(&state, first.customer.id)
        .await
        .unwrap()
        .data
        .unwrap();
    assert_eq!(stats.customer.loyalty_points, 42);
    assert_eq!(stats.customer.total_spent, dec!(4344.00));
    assert_eq!(stats.stats.total_bookings, 3);
    assert_eq!(stats.stats.completed_bookings, 2);
    assert_eq!(stats.stats.pending_bookings, 1);
    assert_eq!(stats.stats.average_spent, dec!(2172.00));
    assert_eq!(
        stats.stats.last_booking.unwrap().date,
        day("2030-01-14")
    );
}
