use rust_decimal::Decimal;
use serde_json::json;
use uuid::Uuid;

use crate::{
    audit::{self, AuditEntry},
    dto::customers::{
        BookingSummary, CustomerList, CustomerStats, CustomerSummary, CustomerWithBookings,
        LastBooking, UpdateCustomerRequest,
    },
    error::{AppError, AppResult},
    models::{Booking, BookingStatus, Customer},
    pricing::round_money,
    response::{ApiResponse, Meta},
    routes::params::{CustomerListQuery, SearchQuery},
    state::AppState,
    store::{BookingFilter, BookingOrder, CustomerChanges, CustomerFilter, CustomerOrder, Page},
};

const RECENT_BOOKINGS: u64 = 10;
const SEARCH_LIMIT: u64 = 20;
const MIN_SEARCH_CHARS: usize = 2;

pub async fn list_customers(
    state: &AppState,
    query: CustomerListQuery,
) -> AppResult<ApiResponse<CustomerList>> {
    let (page, per_page, offset) = query.pagination().normalize();
    let filter = CustomerFilter {
        search: query
            .search
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty()),
    };

    let (items, total) = state
        .store
        .list_customers(
            &filter,
            Page {
                limit: per_page,
                offset,
            },
            CustomerOrder::TotalSpentDesc,
        )
        .await?;

    Ok(ApiResponse::success(
        "Customers",
        CustomerList { items },
        Some(Meta::new(page, per_page, total)),
    ))
}

pub async fn search_customers(
    state: &AppState,
    query: SearchQuery,
) -> AppResult<ApiResponse<CustomerList>> {
    let term = query.q.as_deref().map(str::trim).unwrap_or("");
    if term.chars().count() < MIN_SEARCH_CHARS {
        return Err(AppError::Validation(vec![format!(
            "search query must be at least {MIN_SEARCH_CHARS} characters"
        )]));
    }

    let filter = CustomerFilter {
        search: Some(term.to_string()),
    };
    let (items, _) = state
        .store
        .list_customers(&filter, Page::first(SEARCH_LIMIT), CustomerOrder::NameAsc)
        .await?;

    Ok(ApiResponse::ok("Customers", CustomerList { items }))
}

async fn load_customer(state: &AppState, id: Uuid) -> AppResult<Customer> {
    state
        .store
        .find_customer(id)
        .await?
        .ok_or(AppError::NotFound("Customer"))
}

/// Customer with the ten most recent bookings.
pub async fn get_customer(
    state: &AppState,
    id: Uuid,
) -> AppResult<ApiResponse<CustomerWithBookings>> {
    let customer = load_customer(state, id).await?;
    let filter = BookingFilter {
        customer_id: Some(customer.id),
        ..BookingFilter::default()
    };
    let bookings = state
        .store
        .query_bookings(&filter, Page::first(RECENT_BOOKINGS), BookingOrder::DateDesc)
        .await?;

    Ok(ApiResponse::ok(
        "Customer",
        CustomerWithBookings { customer, bookings },
    ))
}

/// Customer with every booking that was not cancelled.
pub async fn get_customer_by_email(
    state: &AppState,
    email: &str,
) -> AppResult<ApiResponse<CustomerWithBookings>> {
    let customer = state
        .store
        .find_customer_by_email(email)
        .await?
        .ok_or(AppError::NotFound("Customer"))?;

    let filter = BookingFilter {
        statuses: Some(vec![
            BookingStatus::Pending,
            BookingStatus::Confirmed,
            BookingStatus::Completed,
        ]),
        customer_id: Some(customer.id),
        ..BookingFilter::default()
    };
    let bookings = state
        .store
        .query_bookings(&filter, Page::unbounded(), BookingOrder::DateDesc)
        .await?;

    Ok(ApiResponse::ok(
        "Customer",
        CustomerWithBookings { customer, bookings },
    ))
}

pub async fn update_customer(
    state: &AppState,
    id: Uuid,
    payload: UpdateCustomerRequest,
) -> AppResult<ApiResponse<Customer>> {
    let name = payload.name.map(|n| n.trim().to_string());
    if let Some(name) = name.as_deref() {
        let len = name.chars().count();
        if !(2..=100).contains(&len) {
            return Err(AppError::Validation(vec![
                "name must be between 2 and 100 characters".to_string(),
            ]));
        }
    }

    let changes = CustomerChanges {
        name,
        phone: payload.phone.map(|p| p.trim().to_string()),
        address: payload.address.map(|a| a.trim().to_string()),
    };
    let customer = state.store.update_customer(id, changes).await?;

    audit::record(
        state,
        AuditEntry::new("customer_updated", "customers", customer.id)
            .with_metadata(json!({ "email": customer.email })),
    )
    .await;

    Ok(ApiResponse::ok("Customer updated", customer))
}

pub async fn customer_stats(state: &AppState, id: Uuid) -> AppResult<ApiResponse<CustomerStats>> {
    let customer = load_customer(state, id).await?;
    let filter = BookingFilter {
        customer_id: Some(customer.id),
        ..BookingFilter::default()
    };
    let bookings = state
        .store
        .query_bookings(&filter, Page::unbounded(), BookingOrder::DateDesc)
        .await?;

    Ok(ApiResponse::ok(
        "Customer statistics",
        CustomerStats {
            customer: CustomerSummary::from(&customer),
            stats: customer_statistics(&bookings),
        },
    ))
}

/// Summarizes one customer's bookings. Spend and average cover completed
/// bookings only; the last booking is the latest by date, then creation time,
/// then reference number.
pub fn customer_statistics(bookings: &[Booking]) -> BookingSummary {
    let count = |status: BookingStatus| bookings.iter().filter(|b| b.status == status).count() as u64;

    let completed: Vec<&Booking> = bookings
        .iter()
        .filter(|b| b.status == BookingStatus::Completed)
        .collect();
    let total_spent: Decimal = completed.iter().map(|b| b.total_price).sum();
    let average_spent = if completed.is_empty() {
        Decimal::ZERO
    } else {
        total_spent / Decimal::from(completed.len())
    };

    let last_booking = bookings
        .iter()
        .max_by(|a, b| {
            a.date
                .cmp(&b.date)
                .then_with(|| a.created_at.cmp(&b.created_at))
                .then_with(|| a.reference_number.cmp(&b.reference_number))
        })
        .map(|b| LastBooking {
            reference_number: b.reference_number.clone(),
            date: b.date,
            service: b.service_type.clone(),
            amount: b.total_price,
        });

    BookingSummary {
        total_bookings: bookings.len() as u64,
        completed_bookings: completed.len() as u64,
        pending_bookings: count(BookingStatus::Pending),
        confirmed_bookings: count(BookingStatus::Confirmed),
        cancelled_bookings: count(BookingStatus::Cancelled),
        total_spent: round_money(total_spent),
        average_spent: round_money(average_spent),
        last_booking,
    }
}
