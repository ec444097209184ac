use std::cmp::Ordering;

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{
    audit::AuditEntry,
    error::{AppError, AppResult, Conflict},
    models::{Booking, BookingStatus, Customer, PaymentStatus, Service},
};

use super::{
    BookingFilter, BookingOrder, CustomerChanges, CustomerFilter, CustomerOrder, NewBooking,
    NewCustomer, NewService, Page, ServiceChanges, Store,
};

#[derive(Default)]
struct Inner {
    customers: Vec<Customer>,
    services: Vec<Service>,
    bookings: Vec<Booking>,
    audit: Vec<AuditEntry>,
}

impl Inner {
    fn write_booking(&mut self, booking: &Booking) -> AppResult<Booking> {
        let stored = self
            .bookings
            .iter_mut()
            .find(|b| b.id == booking.id)
            .ok_or(AppError::NotFound("Booking"))?;

        if stored.version != booking.version {
            return Err(AppError::Conflict(Conflict::StaleBooking));
        }

        stored.status = booking.status;
        stored.payment_status = booking.payment_status;
        stored.payment_method = booking.payment_method;
        stored.notes = booking.notes.clone();
        stored.version += 1;
        stored.updated_at = Utc::now();
        Ok(stored.clone())
    }
}

/// In-process store used for local runs without Postgres and in tests.
///
/// Every operation runs under a single lock, so check-then-insert sequences
/// (slot availability, unique emails) are atomic.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn audit_entries(&self) -> Vec<AuditEntry> {
        self.inner.lock().await.audit.clone()
    }
}

fn paginate<T>(items: Vec<T>, page: Page) -> Vec<T> {
    items
        .into_iter()
        .skip(page.offset as usize)
        .take(page.limit as usize)
        .collect()
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(needle)
}

#[async_trait]
impl Store for MemoryStore {
    async fn find_customer(&self, id: Uuid) -> AppResult<Option<Customer>> {
        let inner = self.inner.lock().await;
        Ok(inner.customers.iter().find(|c| c.id == id).cloned())
    }

    async fn find_customer_by_email(&self, email: &str) -> AppResult<Option<Customer>> {
        let email = email.trim().to_lowercase();
        let inner = self.inner.lock().await;
        Ok(inner.customers.iter().find(|c| c.email == email).cloned())
    }

    async fn create_customer(&self, customer: NewCustomer) -> AppResult<Customer> {
        let email = customer.email.trim().to_lowercase();
        let mut inner = self.inner.lock().await;
        if inner.customers.iter().any(|c| c.email == email) {
            return Err(AppError::Conflict(Conflict::Email));
        }

        let now = Utc::now();
        let created = Customer {
            id: Uuid::new_v4(),
            name: customer.name,
            email,
            phone: customer.phone,
            address: customer.address,
            loyalty_points: 0,
            total_spent: Decimal::ZERO,
            created_at: now,
            updated_at: now,
        };
        inner.customers.push(created.clone());
        Ok(created)
    }

    async fn update_customer(&self, id: Uuid, changes: CustomerChanges) -> AppResult<Customer> {
        let mut inner = self.inner.lock().await;
        let customer = inner
            .customers
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or(AppError::NotFound("Customer"))?;

        if let Some(name) = changes.name {
            customer.name = name;
        }
        if let Some(phone) = changes.phone {
            customer.phone = Some(phone);
        }
        if let Some(address) = changes.address {
            customer.address = Some(address);
        }
        customer.updated_at = Utc::now();
        Ok(customer.clone())
    }

    async fn list_customers(
        &self,
        filter: &CustomerFilter,
        page: Page,
        order: CustomerOrder,
    ) -> AppResult<(Vec<Customer>, u64)> {
        let inner = self.inner.lock().await;
        let needle = filter
            .search
            .as_ref()
            .map(|s| s.to_lowercase())
            .filter(|s| !s.is_empty());

        let mut matched: Vec<Customer> = inner
            .customers
            .iter()
            .filter(|c| match needle.as_deref() {
                Some(needle) => {
                    contains_ignore_case(&c.name, needle)
                        || contains_ignore_case(&c.email, needle)
                        || c.phone
                            .as_deref()
                            .is_some_and(|p| contains_ignore_case(p, needle))
                }
                None => true,
            })
            .cloned()
            .collect();

        match order {
            CustomerOrder::TotalSpentDesc => matched.sort_by(|a, b| {
                b.total_spent
                    .cmp(&a.total_spent)
                    .then_with(|| a.name.cmp(&b.name))
            }),
            CustomerOrder::NameAsc => matched.sort_by(|a, b| a.name.cmp(&b.name)),
        }

        let total = matched.len() as u64;
        Ok((paginate(matched, page), total))
    }

    async fn find_service(&self, id: Uuid) -> AppResult<Option<Service>> {
        let inner = self.inner.lock().await;
        Ok(inner.services.iter().find(|s| s.id == id).cloned())
    }

    async fn find_service_by_name(&self, name: &str) -> AppResult<Option<Service>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .services
            .iter()
            .find(|s| s.active && s.name == name)
            .cloned())
    }

    async fn list_services(&self, active_only: bool) -> AppResult<Vec<Service>> {
        let inner = self.inner.lock().await;
        let mut services: Vec<Service> = inner
            .services
            .iter()
            .filter(|s| !active_only || s.active)
            .cloned()
            .collect();
        services.sort_by(|a, b| {
            a.base_price
                .cmp(&b.base_price)
                .then_with(|| a.name.cmp(&b.name))
        });
        Ok(services)
    }

    async fn create_service(&self, service: NewService) -> AppResult<Service> {
        let mut inner = self.inner.lock().await;
        if inner.services.iter().any(|s| s.name == service.name) {
            return Err(AppError::Conflict(Conflict::ServiceName));
        }

        let now = Utc::now();
        let created = Service {
            id: Uuid::new_v4(),
            name: service.name,
            description: service.description,
            base_price: service.base_price,
            duration: service.duration,
            vehicle_types: service.vehicle_types,
            category: service.category,
            features: service.features,
            image_url: service.image_url,
            active: service.active,
            created_at: now,
            updated_at: now,
        };
        inner.services.push(created.clone());
        Ok(created)
    }

    async fn update_service(&self, id: Uuid, changes: ServiceChanges) -> AppResult<Service> {
        let mut inner = self.inner.lock().await;
        if let Some(name) = changes.name.as_ref() {
            if inner.services.iter().any(|s| s.id != id && s.name == *name) {
                return Err(AppError::Conflict(Conflict::ServiceName));
            }
        }

        let service = inner
            .services
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or(AppError::NotFound("Service"))?;

        if let Some(name) = changes.name {
            service.name = name;
        }
        if let Some(description) = changes.description {
            service.description = description;
        }
        if let Some(base_price) = changes.base_price {
            service.base_price = base_price;
        }
        if let Some(duration) = changes.duration {
            service.duration = duration;
        }
        if let Some(vehicle_types) = changes.vehicle_types {
            service.vehicle_types = vehicle_types;
        }
        if let Some(category) = changes.category {
            service.category = category;
        }
        if let Some(features) = changes.features {
            service.features = features;
        }
        if let Some(image_url) = changes.image_url {
            service.image_url = Some(image_url);
        }
        if let Some(active) = changes.active {
            service.active = active;
        }
        service.updated_at = Utc::now();
        Ok(service.clone())
    }

    async fn create_booking(&self, booking: NewBooking) -> AppResult<Booking> {
        let mut inner = self.inner.lock().await;
        if inner
            .bookings
            .iter()
            .any(|b| b.reference_number == booking.reference_number)
        {
            return Err(AppError::Conflict(Conflict::ReferenceNumber));
        }
        if inner
            .bookings
            .iter()
            .any(|b| b.status.holds_slot() && b.date == booking.date && b.time == booking.time)
        {
            return Err(AppError::Conflict(Conflict::Slot));
        }
        if !inner.customers.iter().any(|c| c.id == booking.customer_id) {
            return Err(AppError::NotFound("Customer"));
        }

        let now = Utc::now();
        let created = Booking {
            id: Uuid::new_v4(),
            customer_id: booking.customer_id,
            date: booking.date,
            time: booking.time,
            service_type: booking.service_type,
            vehicle_type: booking.vehicle_type,
            vehicle_year: booking.vehicle_year,
            vehicle_make: booking.vehicle_make,
            vehicle_model: booking.vehicle_model,
            condition: booking.condition,
            extras: booking.extras,
            appointment_type: booking.appointment_type,
            total_price: booking.total_price,
            status: BookingStatus::Pending,
            payment_method: booking.payment_method,
            payment_status: PaymentStatus::Pending,
            notes: booking.notes,
            reference_number: booking.reference_number,
            version: 0,
            created_at: now,
            updated_at: now,
        };
        inner.bookings.push(created.clone());
        Ok(created)
    }

    async fn find_booking(&self, id: Uuid) -> AppResult<Option<Booking>> {
        let inner = self.inner.lock().await;
        Ok(inner.bookings.iter().find(|b| b.id == id).cloned())
    }

    async fn find_booking_by_reference(&self, reference: &str) -> AppResult<Option<Booking>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .bookings
            .iter()
            .find(|b| b.reference_number == reference)
            .cloned())
    }

    async fn update_booking(&self, booking: &Booking) -> AppResult<Booking> {
        self.inner.lock().await.write_booking(booking)
    }

    async fn complete_booking(
        &self,
        booking: &Booking,
        points: i32,
        amount: Decimal,
    ) -> AppResult<(Booking, Customer)> {
        let mut inner = self.inner.lock().await;
        let customer_index = inner
            .customers
            .iter()
            .position(|c| c.id == booking.customer_id)
            .ok_or(AppError::NotFound("Customer"))?;
        let updated = inner.write_booking(booking)?;

        let customer = &mut inner.customers[customer_index];
        customer.loyalty_points += points;
        customer.total_spent += amount;
        customer.updated_at = Utc::now();
        Ok((updated, customer.clone()))
    }

    async fn query_bookings(
        &self,
        filter: &BookingFilter,
        page: Page,
        order: BookingOrder,
    ) -> AppResult<Vec<Booking>> {
        let inner = self.inner.lock().await;
        let mut matched: Vec<(usize, &Booking)> = inner
            .bookings
            .iter()
            .enumerate()
            .filter(|(_, b)| filter.matches(b))
            .collect();

        // Insertion index breaks ties between equal timestamps.
        let by_creation = |a: &(usize, &Booking), b: &(usize, &Booking)| -> Ordering {
            a.1.date
                .cmp(&b.1.date)
                .then_with(|| a.1.created_at.cmp(&b.1.created_at))
                .then_with(|| a.0.cmp(&b.0))
        };
        match order {
            BookingOrder::DateDesc => matched.sort_by(|a, b| by_creation(b, a)),
            BookingOrder::DateAsc => matched.sort_by(by_creation),
        }

        let bookings = matched.into_iter().map(|(_, b)| b.clone()).collect();
        Ok(paginate(bookings, page))
    }

    async fn count_bookings(&self, filter: &BookingFilter) -> AppResult<u64> {
        let inner = self.inner.lock().await;
        Ok(inner.bookings.iter().filter(|b| filter.matches(b)).count() as u64)
    }

    async fn sum_total_price(&self, filter: &BookingFilter) -> AppResult<Decimal> {
        let inner = self.inner.lock().await;
        Ok(inner
            .bookings
            .iter()
            .filter(|b| filter.matches(b))
            .map(|b| b.total_price)
            .sum())
    }

    async fn record_audit(&self, entry: AuditEntry) -> AppResult<()> {
        self.inner.lock().await.audit.push(entry);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    use crate::models::AppointmentType;

    async fn customer(store: &MemoryStore) -> Customer {
        store
            .create_customer(NewCustomer {
                name: "Jane Doe".to_string(),
                email: "jane@example.com".to_string(),
                phone: None,
                address: None,
            })
            .await
            .unwrap()
    }

    fn new_booking(customer_id: Uuid, reference: &str, time: &str) -> NewBooking {
        NewBooking {
            customer_id,
            date: NaiveDate::from_ymd_opt(2030, 1, 15).unwrap(),
            time: time.to_string(),
            service_type: "Full Detail".to_string(),
            vehicle_type: "SEDAN".to_string(),
            vehicle_year: None,
            vehicle_make: None,
            vehicle_model: None,
            condition: None,
            extras: vec![],
            appointment_type: AppointmentType::Studio,
            total_price: dec!(100.00),
            payment_method: None,
            notes: None,
            reference_number: reference.to_string(),
        }
    }

    #[tokio::test]
    async fn duplicate_email_is_a_conflict() {
        let store = MemoryStore::new();
        customer(&store).await;
        let err = store
            .create_customer(NewCustomer {
                name: "Other".to_string(),
                email: " JANE@example.com".to_string(),
                phone: None,
                address: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(Conflict::Email)));
    }

    #[tokio::test]
    async fn an_active_booking_holds_its_slot() {
        let store = MemoryStore::new();
        let c = customer(&store).await;
        let first = store
            .create_booking(new_booking(c.id, "AG-1", "09:00 AM"))
            .await
            .unwrap();

        let err = store
            .create_booking(new_booking(c.id, "AG-2", "09:00 AM"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(Conflict::Slot)));

        let mut cancelled = first.clone();
        cancelled.status = BookingStatus::Cancelled;
        store.update_booking(&cancelled).await.unwrap();

        assert!(
            store
                .create_booking(new_booking(c.id, "AG-3", "09:00 AM"))
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn stale_versions_are_rejected() {
        let store = MemoryStore::new();
        let c = customer(&store).await;
        let booking = store
            .create_booking(new_booking(c.id, "AG-1", "11:00 AM"))
            .await
            .unwrap();

        let mut confirmed = booking.clone();
        confirmed.status = BookingStatus::Confirmed;
        let updated = store.update_booking(&confirmed).await.unwrap();
        assert_eq!(updated.version, 1);

        let mut stale = booking;
        stale.status = BookingStatus::Cancelled;
        let err = store.update_booking(&stale).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(Conflict::StaleBooking)));
    }

    #[tokio::test]
    async fn completion_credits_only_when_the_booking_write_lands() {
        let store = MemoryStore::new();
        let c = customer(&store).await;
        let booking = store
            .create_booking(new_booking(c.id, "AG-1", "01:00 PM"))
            .await
            .unwrap();

        let mut stale = booking.clone();
        stale.version = 7;
        stale.status = BookingStatus::Completed;
        let err = store.complete_booking(&stale, 1, dec!(100.00)).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(Conflict::StaleBooking)));
        let untouched = store.find_customer(c.id).await.unwrap().unwrap();
        assert_eq!(untouched.loyalty_points, 0);
        assert_eq!(untouched.total_spent, dec!(0));

        let mut completed = booking;
        completed.status = BookingStatus::Completed;
        let (updated, credited) = store
            .complete_booking(&completed, 1, dec!(100.00))
            .await
            .unwrap();
        assert_eq!(updated.status, BookingStatus::Completed);
        assert_eq!(updated.version, 1);
        assert_eq!(credited.loyalty_points, 1);
        assert_eq!(credited.total_spent, dec!(100.00));
    }
}
