//! Persistence port used by the booking services.
//!
//! Two adapters exist: [`orm::OrmStore`] on Postgres and [`memory::MemoryStore`]
//! kept in process. Both enforce the same uniqueness rules and report them as
//! [`AppError::Conflict`](crate::error::AppError::Conflict).

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
    audit::AuditEntry,
    error::AppResult,
    models::{
        AppointmentType, Booking, BookingStatus, Customer, PaymentMethod, PaymentStatus, Service,
        ServiceCategory,
    },
};

pub mod memory;
pub mod orm;

pub use memory::MemoryStore;
pub use orm::OrmStore;

/// Limit/offset window already normalized by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: u64,
    pub offset: u64,
}

impl Page {
    pub fn first(limit: u64) -> Self {
        Self { limit, offset: 0 }
    }

    /// Every row. Capped at the largest value Postgres accepts for `LIMIT`.
    pub fn unbounded() -> Self {
        Self::first(i64::MAX as u64)
    }
}

#[derive(Debug, Clone, Default)]
pub struct BookingFilter {
    pub statuses: Option<Vec<BookingStatus>>,
    pub payment_status: Option<PaymentStatus>,
    pub customer_id: Option<Uuid>,
    pub date: Option<NaiveDate>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub time: Option<String>,
}

impl BookingFilter {
    pub fn with_status(status: BookingStatus) -> Self {
        Self {
            statuses: Some(vec![status]),
            ..Self::default()
        }
    }

    /// Bookings that occupy a slot on `date`.
    pub fn holding_slots_on(date: NaiveDate) -> Self {
        Self {
            statuses: Some(vec![BookingStatus::Pending, BookingStatus::Confirmed]),
            date: Some(date),
            ..Self::default()
        }
    }

    pub fn matches(&self, booking: &Booking) -> bool {
        self.statuses
            .as_ref()
            .is_none_or(|statuses| statuses.contains(&booking.status))
            && self
                .payment_status
                .is_none_or(|status| status == booking.payment_status)
            && self.customer_id.is_none_or(|id| id == booking.customer_id)
            && self.date.is_none_or(|date| date == booking.date)
            && self.date_from.is_none_or(|from| booking.date >= from)
            && self.date_to.is_none_or(|to| booking.date <= to)
            && self.time.as_ref().is_none_or(|time| *time == booking.time)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BookingOrder {
    /// Most recent appointment first, then most recently created.
    #[default]
    DateDesc,
    /// Earliest appointment first.
    DateAsc,
}

#[derive(Debug, Clone, Default)]
pub struct CustomerFilter {
    /// Case-insensitive substring over name, email and phone.
    pub search: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CustomerOrder {
    #[default]
    TotalSpentDesc,
    NameAsc,
}

#[derive(Debug, Clone)]
pub struct NewCustomer {
    pub name: String,
    /// Already lower-cased and trimmed.
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct CustomerChanges {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewService {
    pub name: String,
    pub description: String,
    pub base_price: Decimal,
    pub duration: i32,
    pub vehicle_types: Vec<String>,
    pub category: ServiceCategory,
    pub features: Vec<String>,
    pub image_url: Option<String>,
    pub active: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ServiceChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub base_price: Option<Decimal>,
    pub duration: Option<i32>,
    pub vehicle_types: Option<Vec<String>>,
    pub category: Option<ServiceCategory>,
    pub features: Option<Vec<String>>,
    pub image_url: Option<String>,
    pub active: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct NewBooking {
    pub customer_id: Uuid,
    pub date: NaiveDate,
    pub time: String,
    pub service_type: String,
    pub vehicle_type: String,
    pub vehicle_year: Option<String>,
    pub vehicle_make: Option<String>,
    pub vehicle_model: Option<String>,
    pub condition: Option<String>,
    pub extras: Vec<String>,
    pub appointment_type: AppointmentType,
    pub total_price: Decimal,
    pub payment_method: Option<PaymentMethod>,
    pub notes: Option<String>,
    pub reference_number: String,
}

#[async_trait]
pub trait Store: Send + Sync {
    async fn find_customer(&self, id: Uuid) -> AppResult<Option<Customer>>;
    async fn find_customer_by_email(&self, email: &str) -> AppResult<Option<Customer>>;
    /// Fails with `Conflict::Email` when the email is taken.
    async fn create_customer(&self, customer: NewCustomer) -> AppResult<Customer>;
    async fn update_customer(&self, id: Uuid, changes: CustomerChanges) -> AppResult<Customer>;
    async fn list_customers(
        &self,
        filter: &CustomerFilter,
        page: Page,
        order: CustomerOrder,
    ) -> AppResult<(Vec<Customer>, u64)>;

    async fn find_service(&self, id: Uuid) -> AppResult<Option<Service>>;
    /// Active services only.
    async fn find_service_by_name(&self, name: &str) -> AppResult<Option<Service>>;
    async fn list_services(&self, active_only: bool) -> AppResult<Vec<Service>>;
    async fn create_service(&self, service: NewService) -> AppResult<Service>;
    async fn update_service(&self, id: Uuid, changes: ServiceChanges) -> AppResult<Service>;

    /// Inserts a pending, unpaid booking. Fails with `Conflict::ReferenceNumber`
    /// or `Conflict::Slot` when a unique rule is violated.
    async fn create_booking(&self, booking: NewBooking) -> AppResult<Booking>;
    async fn find_booking(&self, id: Uuid) -> AppResult<Option<Booking>>;
    async fn find_booking_by_reference(&self, reference: &str) -> AppResult<Option<Booking>>;
    /// Writes status, payment and notes when the stored version still equals
    /// `booking.version`; returns the row with its version bumped.
    async fn update_booking(&self, booking: &Booking) -> AppResult<Booking>;
    /// Writes `booking` under the same version check as `update_booking` and
    /// adds `points` and `amount` to its customer's loyalty and spend counters.
    /// Both writes land together or not at all.
    async fn complete_booking(
        &self,
        booking: &Booking,
        points: i32,
        amount: Decimal,
    ) -> AppResult<(Booking, Customer)>;
    async fn query_bookings(
        &self,
        filter: &BookingFilter,
        page: Page,
        order: BookingOrder,
    ) -> AppResult<Vec<Booking>>;
    async fn count_bookings(&self, filter: &BookingFilter) -> AppResult<u64>;
    async fn sum_total_price(&self, filter: &BookingFilter) -> AppResult<Decimal>;

    async fn record_audit(&self, entry: AuditEntry) -> AppResult<()>;
}
