use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    calendar::{DAILY_SLOTS, normalize_slot},
    error::{AppError, AppResult},
    models::{AppointmentType, BookingDetail, BookingStatus, PaymentMethod, PaymentStatus},
    pricing::normalize_extras,
};

pub const DEFAULT_CUSTOMER_NAME: &str = "Guest Customer";
const MAX_NOTES_CHARS: usize = 500;

/// Booking payload as submitted by the booking form. Required fields are
/// optional here so that every missing one can be reported at once.
#[derive(Debug, Default, Clone, Deserialize, ToSchema)]
pub struct CreateBookingRequest {
    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
    pub customer_phone: Option<String>,
    pub customer_address: Option<String>,
    #[schema(example = "2030-01-15")]
    pub date: Option<String>,
    #[schema(example = "09:00 AM")]
    pub time: Option<String>,
    #[schema(example = "Full Detail")]
    pub service_type: Option<String>,
    #[schema(example = "SUV")]
    pub vehicle_type: Option<String>,
    pub vehicle_year: Option<String>,
    pub vehicle_make: Option<String>,
    pub vehicle_model: Option<String>,
    #[schema(example = "MODERATE")]
    pub condition: Option<String>,
    #[serde(default)]
    pub extras: Vec<String>,
    pub appointment_type: Option<String>,
    pub notes: Option<String>,
    pub payment_method: Option<String>,
}

/// A create request that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct BookingInput {
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: Option<String>,
    pub customer_address: Option<String>,
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
    pub notes: Option<String>,
    pub payment_method: Option<PaymentMethod>,
}

fn present(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn looks_like_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !email.chars().any(char::is_whitespace)
}

impl CreateBookingRequest {
    /// Checks the payload against `today` and normalizes it.
    ///
    /// Missing required fields are reported first, all together. Vehicle
    /// type, condition and extras are never rejected: unknown values price
    /// at the neutral multiplier.
    pub fn validate(&self, today: NaiveDate) -> AppResult<BookingInput> {
        let email = present(&self.customer_email);
        let date = present(&self.date);
        let time = present(&self.time);
        let service_type = present(&self.service_type);
        let vehicle_type = present(&self.vehicle_type);

        let missing: Vec<String> = [
            ("customer_email", email.is_none()),
            ("date", date.is_none()),
            ("time", time.is_none()),
            ("service_type", service_type.is_none()),
            ("vehicle_type", vehicle_type.is_none()),
        ]
        .into_iter()
        .filter(|(_, absent)| *absent)
        .map(|(field, _)| format!("{field} is required"))
        .collect();

        let (Some(email), Some(date), Some(time), Some(service_type), Some(vehicle_type)) =
            (email, date, time, service_type, vehicle_type)
        else {
            return Err(AppError::Validation(missing));
        };

        let mut errors = Vec::new();

        let email = email.to_lowercase();
        if !looks_like_email(&email) {
            errors.push("customer_email must be a valid email address".to_string());
        }

        let date = match NaiveDate::parse_from_str(&date, "%Y-%m-%d") {
            Ok(date) if date < today => {
                errors.push("date cannot be in the past".to_string());
                None
            }
            Ok(date) => Some(date),
            Err(_) => {
                errors.push("date must be formatted YYYY-MM-DD".to_string());
                None
            }
        };

        let slot = normalize_slot(&time);
        if slot.is_none() {
            errors.push(format!("time must be one of: {}", DAILY_SLOTS.join(", ")));
        }

        let vehicle_year = present(&self.vehicle_year);
        if let Some(year) = vehicle_year.as_deref() {
            if year.len() != 4 || !year.chars().all(|c| c.is_ascii_digit()) {
                errors.push("vehicle_year must be a four-digit year".to_string());
            }
        }

        let notes = present(&self.notes);
        if notes
            .as_deref()
            .is_some_and(|n| n.chars().count() > MAX_NOTES_CHARS)
        {
            errors.push(format!("notes must be at most {MAX_NOTES_CHARS} characters"));
        }

        let appointment_type = match present(&self.appointment_type) {
            Some(raw) => AppointmentType::parse(&raw).or_else(|| {
                errors.push("appointment_type must be studio or mobile".to_string());
                None
            }),
            None => Some(AppointmentType::default()),
        };

        let payment_method = match present(&self.payment_method) {
            Some(raw) => match PaymentMethod::parse(&raw) {
                Some(method) => Some(method),
                None => {
                    errors.push("payment_method must be card or cash".to_string());
                    None
                }
            },
            None => None,
        };

        let (Some(date), Some(slot), Some(appointment_type)) = (date, slot, appointment_type)
        else {
            return Err(AppError::Validation(errors));
        };
        if !errors.is_empty() {
            return Err(AppError::Validation(errors));
        }

        Ok(BookingInput {
            customer_name: present(&self.customer_name)
                .unwrap_or_else(|| DEFAULT_CUSTOMER_NAME.to_string()),
            customer_email: email,
            customer_phone: present(&self.customer_phone),
            customer_address: present(&self.customer_address),
            date,
            time: slot.to_string(),
            service_type,
            vehicle_type: vehicle_type.to_ascii_uppercase(),
            vehicle_year,
            vehicle_make: present(&self.vehicle_make),
            vehicle_model: present(&self.vehicle_model),
            condition: present(&self.condition).map(|c| c.to_ascii_uppercase()),
            extras: normalize_extras(&self.extras),
            appointment_type,
            notes,
            payment_method,
        })
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateStatusRequest {
    #[schema(example = "confirmed")]
    pub status: String,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdatePaymentRequest {
    #[schema(example = "paid")]
    pub payment_status: String,
    pub payment_method: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct CancelBookingRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BookingList {
    pub items: Vec<BookingDetail>,
}

/// Outcome of a status or payment change, with enough context for a caller
/// to decide on notifications.
#[derive(Debug, Serialize, ToSchema)]
pub struct BookingTransition {
    pub previous_status: BookingStatus,
    pub status: BookingStatus,
    pub previous_payment_status: PaymentStatus,
    pub payment_status: PaymentStatus,
    pub booking: BookingDetail,
}

impl BookingTransition {
    pub fn status_changed(&self) -> bool {
        self.previous_status != self.status
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SlotAvailability {
    pub date: NaiveDate,
    pub available_slots: Vec<String>,
    pub booked_slots: Vec<String>,
    pub total_slots: usize,
    pub available_count: usize,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BookingStats {
    pub total_bookings: u64,
    pub pending_bookings: u64,
    pub confirmed_bookings: u64,
    pub completed_bookings: u64,
    pub cancelled_bookings: u64,
    #[schema(value_type = String, example = "2172.00")]
    pub monthly_revenue: Decimal,
    pub weekly_bookings: u64,
    pub today_bookings: u64,
    pub generated_at: DateTime<Utc>,
}
