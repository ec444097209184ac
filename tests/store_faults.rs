use std::sync::{
    Arc,
    atomic::{AtomicBool, AtomicU32, Ordering},
};

use aquaglow_bookings::{
    audit::AuditEntry,
    dto::bookings::{CreateBookingRequest, UpdatePaymentRequest, UpdateStatusRequest},
    error::{AppError, AppResult, Conflict},
    models::{Booking, BookingStatus, Customer, Service, ServiceCategory},
    services::booking_service,
    state::AppState,
    store::{
        BookingFilter, BookingOrder, CustomerChanges, CustomerFilter, CustomerOrder, MemoryStore,
        NewBooking, NewCustomer, NewService, Page, ServiceChanges, Store,
    },
};
use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

/// Wraps [`MemoryStore`] and injects failures into selected writes.
#[derive(Default)]
struct FaultyStore {
    inner: MemoryStore,
    /// Completions that fail before anything is written.
    failing_completions: AtomicU32,
    /// Booking inserts answered with a reference number collision.
    reference_collisions: AtomicU32,
    booking_inserts: AtomicU32,
    /// Next customer insert loses the race to a concurrent insert of the same email.
    email_race: AtomicBool,
}

fn take_one(counter: &AtomicU32) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

#[async_trait]
impl Store for FaultyStore {
    async fn find_customer(&self, id: Uuid) -> AppResult<Option<Customer>> {
        self.inner.find_customer(id).await
    }

    async fn find_customer_by_email(&self, email: &str) -> AppResult<Option<Customer>> {
        self.inner.find_customer_by_email(email).await
    }

    async fn create_customer(&self, customer: NewCustomer) -> AppResult<Customer> {
        if self.email_race.swap(false, Ordering::SeqCst) {
            self.inner
                .create_customer(NewCustomer {
                    name: "Concurrent Jane".into(),
                    ..customer
                })
                .await?;
            return Err(AppError::Conflict(Conflict::Email));
        }
        self.inner.create_customer(customer).await
    }

    async fn update_customer(&self, id: Uuid, changes: CustomerChanges) -> AppResult<Customer> {
        self.inner.update_customer(id, changes).await
    }

    async fn list_customers(
        &self,
        filter: &CustomerFilter,
        page: Page,
        order: CustomerOrder,
    ) -> AppResult<(Vec<Customer>, u64)> {
        self.inner.list_customers(filter, page, order).await
    }

    async fn find_service(&self, id: Uuid) -> AppResult<Option<Service>> {
        self.inner.find_service(id).await
    }

    async fn find_service_by_name(&self, name: &str) -> AppResult<Option<Service>> {
        self.inner.find_service_by_name(name).await
    }

    async fn list_services(&self, active_only: bool) -> AppResult<Vec<Service>> {
        self.inner.list_services(active_only).await
    }

    async fn create_service(&self, service: NewService) -> AppResult<Service> {
        self.inner.create_service(service).await
    }

    async fn update_service(&self, id: Uuid, changes: ServiceChanges) -> AppResult<Service> {
        self.inner.update_service(id, changes).await
    }

    async fn create_booking(&self, booking: NewBooking) -> AppResult<Booking> {
        self.booking_inserts.fetch_add(1, Ordering::SeqCst);
        if take_one(&self.reference_collisions) {
            return Err(AppError::Conflict(Conflict::ReferenceNumber));
        }
        self.inner.create_booking(booking).await
    }

    async fn find_booking(&self, id: Uuid) -> AppResult<Option<Booking>> {
        self.inner.find_booking(id).await
    }

    async fn find_booking_by_reference(&self, reference: &str) -> AppResult<Option<Booking>> {
        self.inner.find_booking_by_reference(reference).await
    }

    async fn update_booking(&self, booking: &Booking) -> AppResult<Booking> {
        self.inner.update_booking(booking).await
    }

    async fn complete_booking(
        &self,
        booking: &Booking,
        points: i32,
        amount: Decimal,
    ) -> AppResult<(Booking, Customer)> {
        if take_one(&self.failing_completions) {
            return Err(AppError::Internal(anyhow::anyhow!("database unavailable")));
        }
        self.inner.complete_booking(booking, points, amount).await
    }

    async fn query_bookings(
        &self,
        filter: &BookingFilter,
        page: Page,
        order: BookingOrder,
    ) -> AppResult<Vec<Booking>> {
        self.inner.query_bookings(filter, page, order).await
    }

    async fn count_bookings(&self, filter: &BookingFilter) -> AppResult<u64> {
        self.inner.count_bookings(filter).await
    }

    async fn sum_total_price(&self, filter: &BookingFilter) -> AppResult<Decimal> {
        self.inner.sum_total_price(filter).await
    }

    async fn record_audit(&self, entry: AuditEntry) -> AppResult<()> {
        self.inner.record_audit(entry).await
    }
}

async fn setup() -> (Arc<FaultyStore>, AppState) {
    let store = Arc::new(FaultyStore::default());
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

fn request() -> CreateBookingRequest {
    CreateBookingRequest {
        customer_name: Some("Jane Doe".into()),
        customer_email: Some("jane@example.com".into()),
        date: Some("2030-01-15".into()),
        time: Some("09:00 AM".into()),
        service_type: Some("Full Detail".into()),
        vehicle_type: Some("SUV".into()),
        condition: Some("MODERATE".into()),
        extras: vec!["ENGINE".into()],
        ..Default::default()
    }
}

fn booking_day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2030, 1, 1).unwrap()
}

async fn complete(state: &AppState, id: Uuid) -> Result<(), AppError> {
    booking_service::update_booking_status(
        state,
        id,
        UpdateStatusRequest {
            status: "completed".into(),
            notes: None,
        },
    )
    .await
    .map(|_| ())
}

#[tokio::test]
async fn failed_completion_can_be_retried_and_credits_once() {
    let (store, state) = setup().await;
    let created = booking_service::create_booking_on(&state, request(), booking_day())
        .await
        .unwrap()
        .data
        .unwrap();
    booking_service::update_payment_status(
        &state,
        created.booking.id,
        UpdatePaymentRequest {
            payment_status: "paid".into(),
            payment_method: Some("card".into()),
        },
    )
    .await
    .unwrap();

    store.failing_completions.store(1, Ordering::SeqCst);
    let err = complete(&state, created.booking.id).await.unwrap_err();
    assert!(matches!(err, AppError::Internal(_)));

    let booking = store.find_booking(created.booking.id).await.unwrap().unwrap();
    assert_eq!(booking.status, BookingStatus::Confirmed);

    complete(&state, created.booking.id).await.unwrap();
    let customer = store
        .find_customer(created.customer.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(customer.loyalty_points, 21);
    assert_eq!(customer.total_spent, dec!(2172.00));

    let err = complete(&state, created.booking.id).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidTransition { .. }));
    let customer = store
        .find_customer(created.customer.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(customer.loyalty_points, 21);
}

#[tokio::test]
async fn reference_collision_is_regenerated() {
    let (store, state) = setup().await;
    store.reference_collisions.store(1, Ordering::SeqCst);

    let created = booking_service::create_booking_on(&state, request(), booking_day())
        .await
        .unwrap()
        .data
        .unwrap();

    assert_eq!(store.booking_inserts.load(Ordering::SeqCst), 2);
    assert!(created.booking.reference_number.starts_with("AG-"));
    assert!(
        store
            .find_booking(created.booking.id)
            .await
            .unwrap()
            .is_some()
    );
}

#[tokio::test]
async fn persistent_reference_collisions_give_up_after_three_attempts() {
    let (store, state) = setup().await;
    store.reference_collisions.store(u32::MAX, Ordering::SeqCst);

    let err = booking_service::create_booking_on(&state, request(), booking_day())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        AppError::Conflict(Conflict::ReferenceNumber)
    ));
    assert_eq!(store.booking_inserts.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn lost_email_race_attaches_the_booking_to_the_winner() {
    let (store, state) = setup().await;
    store.email_race.store(true, Ordering::SeqCst);

    let created = booking_service::create_booking_on(&state, request(), booking_day())
        .await
        .unwrap()
        .data
        .unwrap();

    let winner = store
        .find_customer_by_email("jane@example.com")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(winner.name, "Concurrent Jane");
    assert_eq!(created.customer.id, winner.id);
    assert_eq!(created.booking.customer_id, winner.id);

    let (customers, total) = store
        .list_customers(&CustomerFilter::default(), Page::first(10), CustomerOrder::NameAsc)
        .await
        .unwrap();
    assert_eq!(total, 1);
    assert_eq!(customers.len(), 1);
}
