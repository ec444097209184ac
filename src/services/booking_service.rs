//! Booking lifecycle: creation, status and payment transitions, cancellation,
//! slot availability and the dashboard statistics.

use std::collections::HashMap;

use chrono::{NaiveDate, Utc};
use serde_json::json;
use uuid::Uuid;

use crate::{
    audit::{self, AuditEntry},
    calendar::{self, DAILY_SLOTS, StatsWindow},
    dto::bookings::{
        BookingInput, BookingList, BookingStats, BookingTransition, CancelBookingRequest,
        CreateBookingRequest, SlotAvailability, UpdatePaymentRequest, UpdateStatusRequest,
    },
    error::{AppError, AppResult, Conflict},
    models::{
        Booking, BookingDetail, BookingStatus, Customer, PaymentMethod, PaymentStatus,
        loyalty_points_for,
    },
    pricing,
    response::{ApiResponse, Meta},
    routes::params::BookingListQuery,
    state::AppState,
    store::{BookingFilter, BookingOrder, NewBooking, NewCustomer, Page},
};

const REFERENCE_ATTEMPTS: u32 = 3;

pub async fn create_booking(
    state: &AppState,
    payload: CreateBookingRequest,
) -> AppResult<ApiResponse<BookingDetail>> {
    create_booking_on(state, payload, Utc::now().date_naive()).await
}

/// Same as [`create_booking`] with an explicit "today" for the past-date check.
pub async fn create_booking_on(
    state: &AppState,
    payload: CreateBookingRequest,
    today: NaiveDate,
) -> AppResult<ApiResponse<BookingDetail>> {
    let input = payload.validate(today)?;

    let service = state
        .store
        .find_service_by_name(&input.service_type)
        .await?
        .ok_or_else(|| AppError::ServiceNotFound(input.service_type.clone()))?;

    let total_price = pricing::calculate_price(
        service.base_price,
        &input.vehicle_type,
        input.condition.as_deref(),
        &input.extras,
    );

    let slot_filter = BookingFilter {
        time: Some(input.time.clone()),
        ..BookingFilter::holding_slots_on(input.date)
    };
    if state.store.count_bookings(&slot_filter).await? > 0 {
        return Err(AppError::Conflict(Conflict::Slot));
    }

    let customer = find_or_create_customer(state, &input).await?;
    let booking = insert_booking(state, &input, customer.id, total_price).await?;

    tracing::info!(
        booking_id = %booking.id,
        reference = %booking.reference_number,
        total_price = %booking.total_price,
        "booking created"
    );
    audit::record(
        state,
        AuditEntry::new("booking_created", "bookings", booking.id).with_metadata(json!({
            "reference_number": booking.reference_number,
            "customer_id": customer.id,
            "total_price": booking.total_price.to_string(),
        })),
    )
    .await;

    Ok(ApiResponse::ok(
        "Booking created",
        BookingDetail { booking, customer },
    ))
}

async fn find_or_create_customer(state: &AppState, input: &BookingInput) -> AppResult<Customer> {
    if let Some(customer) = state
        .store
        .find_customer_by_email(&input.customer_email)
        .await?
    {
        return Ok(customer);
    }

    let created = state
        .store
        .create_customer(NewCustomer {
            name: input.customer_name.clone(),
            email: input.customer_email.clone(),
            phone: input.customer_phone.clone(),
            address: input.customer_address.clone(),
        })
        .await;

    match created {
        Ok(customer) => Ok(customer),
        // Lost the race against a concurrent first booking with this email.
        Err(AppError::Conflict(Conflict::Email)) => state
            .store
            .find_customer_by_email(&input.customer_email)
            .await?
            .ok_or(AppError::NotFound("Customer")),
        Err(err) => Err(err),
    }
}

async fn insert_booking(
    state: &AppState,
    input: &BookingInput,
    customer_id: Uuid,
    total_price: rust_decimal::Decimal,
) -> AppResult<Booking> {
    let mut attempt = 0;
    loop {
        attempt += 1;
        let new_booking = NewBooking {
            customer_id,
            date: input.date,
            time: input.time.clone(),
            service_type: input.service_type.clone(),
            vehicle_type: input.vehicle_type.clone(),
            vehicle_year: input.vehicle_year.clone(),
            vehicle_make: input.vehicle_make.clone(),
            vehicle_model: input.vehicle_model.clone(),
            condition: input.condition.clone(),
            extras: input.extras.clone(),
            appointment_type: input.appointment_type,
            total_price,
            payment_method: input.payment_method,
            notes: input.notes.clone(),
            reference_number: build_reference_number(),
        };

        match state.store.create_booking(new_booking).await {
            Err(AppError::Conflict(Conflict::ReferenceNumber)) if attempt < REFERENCE_ATTEMPTS => {
                tracing::warn!(attempt, "reference number collision, regenerating");
            }
            result => return result,
        }
    }
}

fn build_reference_number() -> String {
    let millis = Utc::now().timestamp_millis();
    let suffix = Uuid::new_v4().simple().to_string().to_uppercase();
    format!("AG-{}-{}", millis, &suffix[..6])
}

pub async fn list_bookings(
    state: &AppState,
    query: BookingListQuery,
) -> AppResult<ApiResponse<BookingList>> {
    let (page, per_page, offset) = query.pagination().normalize();

    let mut filter = BookingFilter::default();
    let mut errors = Vec::new();

    if let Some(raw) = query.status.as_deref().filter(|s| !s.trim().is_empty()) {
        match BookingStatus::parse(raw) {
            Some(status) => filter.statuses = Some(vec![status]),
            None => errors.push(format!("unknown status '{raw}'")),
        }
    }
    filter.date_from = parse_optional_date("date_from", query.date_from.as_deref(), &mut errors);
    filter.date_to = parse_optional_date("date_to", query.date_to.as_deref(), &mut errors);
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    if let Some(email) = query
        .customer_email
        .as_deref()
        .map(str::trim)
        .filter(|e| !e.is_empty())
    {
        match state.store.find_customer_by_email(email).await? {
            Some(customer) => filter.customer_id = Some(customer.id),
            None => {
                return Ok(ApiResponse::success(
                    "Bookings",
                    BookingList { items: Vec::new() },
                    Some(Meta::new(page, per_page, 0)),
                ));
            }
        }
    }

    let total = state.store.count_bookings(&filter).await?;
    let bookings = state
        .store
        .query_bookings(
            &filter,
            Page {
                limit: per_page,
                offset,
            },
            BookingOrder::DateDesc,
        )
        .await?;

    let items = attach_customers(state, bookings).await?;
    let meta = Meta::new(page, per_page, total);
    Ok(ApiResponse::success(
        "Bookings",
        BookingList { items },
        Some(meta),
    ))
}

fn parse_optional_date(
    field: &str,
    raw: Option<&str>,
    errors: &mut Vec<String>,
) -> Option<NaiveDate> {
    let raw = raw.map(str::trim).filter(|r| !r.is_empty())?;
    match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        Ok(date) => Some(date),
        Err(_) => {
            errors.push(format!("{field} must be formatted YYYY-MM-DD"));
            None
        }
    }
}

async fn attach_customers(state: &AppState, bookings: Vec<Booking>) -> AppResult<Vec<BookingDetail>> {
    let mut customers: HashMap<Uuid, Customer> = HashMap::new();
    let mut details = Vec::with_capacity(bookings.len());
    for booking in bookings {
        let customer = match customers.get(&booking.customer_id) {
            Some(customer) => customer.clone(),
            None => {
                let customer = load_customer(state, booking.customer_id).await?;
                customers.insert(customer.id, customer.clone());
                customer
            }
        };
        details.push(BookingDetail { booking, customer });
    }
    Ok(details)
}

async fn load_booking(state: &AppState, id: Uuid) -> AppResult<Booking> {
    state
        .store
        .find_booking(id)
        .await?
        .ok_or(AppError::NotFound("Booking"))
}

async fn load_customer(state: &AppState, id: Uuid) -> AppResult<Customer> {
    state
        .store
        .find_customer(id)
        .await?
        .ok_or(AppError::NotFound("Customer"))
}

pub async fn get_booking(state: &AppState, id: Uuid) -> AppResult<ApiResponse<BookingDetail>> {
    let booking = load_booking(state, id).await?;
    let customer = load_customer(state, booking.customer_id).await?;
    Ok(ApiResponse::ok("Booking", BookingDetail { booking, customer }))
}

pub async fn get_booking_by_reference(
    state: &AppState,
    reference: &str,
) -> AppResult<ApiResponse<BookingDetail>> {
    let booking = state
        .store
        .find_booking_by_reference(reference.trim())
        .await?
        .ok_or(AppError::NotFound("Booking"))?;
    let customer = load_customer(state, booking.customer_id).await?;
    Ok(ApiResponse::ok("Booking", BookingDetail { booking, customer }))
}

/// Moves a booking to `payload.status`.
///
/// Loyalty points and spend are credited only on the edge into `completed`
/// with payment already `paid`. The status write and the credit are one store
/// call, and its version check means two racing completions cannot both pass
/// that edge.
pub async fn update_booking_status(
    state: &AppState,
    id: Uuid,
    payload: UpdateStatusRequest,
) -> AppResult<ApiResponse<BookingTransition>> {
    let to = BookingStatus::parse(&payload.status).ok_or_else(|| {
        AppError::Validation(vec![
            "status must be one of: pending, confirmed, completed, cancelled".to_string(),
        ])
    })?;

    let mut booking = load_booking(state, id).await?;
    let previous_status = booking.status;
    let previous_payment_status = booking.payment_status;
    previous_status.ensure_transition(to)?;

    booking.status = to;
    if let Some(notes) = payload.notes {
        booking.notes = Some(notes);
    }

    let completed_now = to == BookingStatus::Completed && previous_status != BookingStatus::Completed;
    let (booking, customer) = if completed_now && booking.payment_status == PaymentStatus::Paid {
        let points = loyalty_points_for(booking.total_price);
        let amount = booking.total_price;
        let (booking, customer) = state.store.complete_booking(&booking, points, amount).await?;
        tracing::info!(
            customer_id = %customer.id,
            points,
            amount = %amount,
            "loyalty awarded"
        );
        (booking, customer)
    } else {
        let booking = state.store.update_booking(&booking).await?;
        let customer = load_customer(state, booking.customer_id).await?;
        (booking, customer)
    };

    tracing::info!(
        booking_id = %booking.id,
        from = %previous_status,
        to = %booking.status,
        "booking status updated"
    );
    audit::record(
        state,
        AuditEntry::new("booking_status_updated", "bookings", booking.id).with_metadata(json!({
            "from": previous_status.as_str(),
            "to": booking.status.as_str(),
        })),
    )
    .await;

    Ok(ApiResponse::ok(
        "Booking status updated",
        BookingTransition {
            previous_status,
            status: booking.status,
            previous_payment_status,
            payment_status: booking.payment_status,
            booking: BookingDetail { booking, customer },
        },
    ))
}

/// Sets the payment status, overriding any earlier value. Becoming `paid`
/// confirms a pending booking.
pub async fn update_payment_status(
    state: &AppState,
    id: Uuid,
    payload: UpdatePaymentRequest,
) -> AppResult<ApiResponse<BookingTransition>> {
    let mut errors = Vec::new();
    let payment_status = PaymentStatus::parse(&payload.payment_status);
    if payment_status.is_none() {
        errors.push("payment_status must be one of: pending, paid, failed".to_string());
    }
    let payment_method = match payload.payment_method.as_deref().map(str::trim) {
        Some(raw) if !raw.is_empty() => {
            let method = PaymentMethod::parse(raw);
            if method.is_none() {
                errors.push("payment_method must be card or cash".to_string());
            }
            method
        }
        _ => None,
    };
    let Some(payment_status) = payment_status else {
        return Err(AppError::Validation(errors));
    };
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    let mut booking = load_booking(state, id).await?;
    let previous_status = booking.status;
    let previous_payment_status = booking.payment_status;

    booking.payment_status = payment_status;
    if let Some(method) = payment_method {
        booking.payment_method = Some(method);
    }
    if payment_status == PaymentStatus::Paid && booking.status == BookingStatus::Pending {
        booking.status = BookingStatus::Confirmed;
    }
    let booking = state.store.update_booking(&booking).await?;
    let customer = load_customer(state, booking.customer_id).await?;

    tracing::info!(
        booking_id = %booking.id,
        from = %previous_payment_status,
        to = %booking.payment_status,
        status = %booking.status,
        "payment status updated"
    );
    audit::record(
        state,
        AuditEntry::new("booking_payment_updated", "bookings", booking.id).with_metadata(json!({
            "from": previous_payment_status.as_str(),
            "to": booking.payment_status.as_str(),
            "status": booking.status.as_str(),
        })),
    )
    .await;

    Ok(ApiResponse::ok(
        "Payment status updated",
        BookingTransition {
            previous_status,
            status: booking.status,
            previous_payment_status,
            payment_status: booking.payment_status,
            booking: BookingDetail { booking, customer },
        },
    ))
}

/// Cancels a pending or confirmed booking. Loyalty already awarded is kept.
pub async fn cancel_booking(
    state: &AppState,
    id: Uuid,
    payload: CancelBookingRequest,
) -> AppResult<ApiResponse<BookingDetail>> {
    let mut booking = load_booking(state, id).await?;
    booking.status.ensure_transition(BookingStatus::Cancelled)?;

    booking.notes = Some(booking.cancellation_notes(payload.reason.as_deref()));
    booking.status = BookingStatus::Cancelled;
    let booking = state.store.update_booking(&booking).await?;
    let customer = load_customer(state, booking.customer_id).await?;

    tracing::info!(booking_id = %booking.id, "booking cancelled");
    audit::record(
        state,
        AuditEntry::new("booking_cancelled", "bookings", booking.id)
            .with_metadata(json!({ "reason": payload.reason })),
    )
    .await;

    Ok(ApiResponse::ok(
        "Booking cancelled",
        BookingDetail { booking, customer },
    ))
}

pub async fn available_slots(
    state: &AppState,
    date: Option<&str>,
) -> AppResult<ApiResponse<SlotAvailability>> {
    let raw = date.map(str::trim).filter(|d| !d.is_empty()).ok_or_else(|| {
        AppError::Validation(vec!["date is required".to_string()])
    })?;
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
        AppError::Validation(vec!["date must be formatted YYYY-MM-DD".to_string()])
    })?;

    let held = state
        .store
        .query_bookings(
            &BookingFilter::holding_slots_on(date),
            Page::unbounded(),
            BookingOrder::DateAsc,
        )
        .await?;

    let booked_slots: Vec<String> = DAILY_SLOTS
        .iter()
        .filter(|slot| held.iter().any(|b| b.time == **slot))
        .map(|slot| slot.to_string())
        .collect();
    let available = calendar::available_slots(&booked_slots);

    Ok(ApiResponse::ok(
        "Available slots",
        SlotAvailability {
            date,
            total_slots: DAILY_SLOTS.len(),
            available_count: available.len(),
            available_slots: available,
            booked_slots,
        },
    ))
}

pub async fn booking_stats(state: &AppState) -> AppResult<ApiResponse<BookingStats>> {
    booking_stats_on(state, Utc::now().date_naive()).await
}

/// Statistics relative to `today`: the week starts on the preceding Sunday
/// and monthly revenue counts completed, paid bookings dated this month.
pub async fn booking_stats_on(
    state: &AppState,
    today: NaiveDate,
) -> AppResult<ApiResponse<BookingStats>> {
    let window = StatsWindow::for_day(today);
    let store = &state.store;

    let total_bookings = store.count_bookings(&BookingFilter::default()).await?;
    let pending_bookings = store
        .count_bookings(&BookingFilter::with_status(BookingStatus::Pending))
        .await?;
    let confirmed_bookings = store
        .count_bookings(&BookingFilter::with_status(BookingStatus::Confirmed))
        .await?;
    let completed_bookings = store
        .count_bookings(&BookingFilter::with_status(BookingStatus::Completed))
        .await?;
    let cancelled_bookings = store
        .count_bookings(&BookingFilter::with_status(BookingStatus::Cancelled))
        .await?;

    let revenue_filter = BookingFilter {
        payment_status: Some(PaymentStatus::Paid),
        date_from: Some(window.month_start),
        ..BookingFilter::with_status(BookingStatus::Completed)
    };
    let monthly_revenue = pricing::round_money(store.sum_total_price(&revenue_filter).await?);

    let weekly_bookings = store
        .count_bookings(&BookingFilter {
            date_from: Some(window.week_start),
            ..BookingFilter::default()
        })
        .await?;
    let today_bookings = store
        .count_bookings(&BookingFilter {
            date: Some(window.today),
            ..BookingFilter::default()
        })
        .await?;

    Ok(ApiResponse::ok(
        "Booking statistics",
        BookingStats {
            total_bookings,
            pending_bookings,
            confirmed_bookings,
            completed_bookings,
            cancelled_bookings,
            monthly_revenue,
            weekly_bookings,
            today_bookings,
            generated_at: Utc::now(),
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_numbers_follow_the_public_pattern() {
        let reference = build_reference_number();
        let parts: Vec<&str> = reference.split('-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "AG");
        assert!(parts[1].chars().all(|c| c.is_ascii_digit()));
        assert_eq!(parts[2].len(), 6);
        assert!(
            parts[2]
                .chars()
                .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase())
        );
    }
}
