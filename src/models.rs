use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Lifecycle state of a booking. `Completed` and `Cancelled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

impl BookingStatus {
    pub const ALL: [BookingStatus; 4] = [
        BookingStatus::Pending,
        BookingStatus::Confirmed,
        BookingStatus::Completed,
        BookingStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" => Some(BookingStatus::Pending),
            "confirmed" => Some(BookingStatus::Confirmed),
            "completed" => Some(BookingStatus::Completed),
            "cancelled" => Some(BookingStatus::Cancelled),
            _ => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, BookingStatus::Completed | BookingStatus::Cancelled)
    }

    /// Pending and confirmed bookings hold their slot.
    pub fn holds_slot(self) -> bool {
        matches!(self, BookingStatus::Pending | BookingStatus::Confirmed)
    }

    /// Validates `self -> to` against the lifecycle table.
    ///
    /// Same-state moves on a non-terminal booking are accepted as no-ops;
    /// anything leaving a terminal state is rejected, including a repeat of
    /// the terminal state itself.
    pub fn ensure_transition(self, to: BookingStatus) -> AppResult<()> {
        use BookingStatus::*;
        match (self, to) {
            (Cancelled, Cancelled) => Err(AppError::AlreadyCancelled),
            (Completed, Cancelled) => Err(AppError::CannotCancelCompleted),
            (Cancelled | Completed, _) => Err(AppError::InvalidTransition { from: self, to }),
            (Confirmed, Pending) => Err(AppError::InvalidTransition { from: self, to }),
            (Pending | Confirmed, _) => Ok(()),
        }
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Failed => "failed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" => Some(PaymentStatus::Pending),
            "paid" => Some(PaymentStatus::Paid),
            "failed" => Some(PaymentStatus::Failed),
            _ => None,
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Card,
    Cash,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Card => "card",
            PaymentMethod::Cash => "cash",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "card" => Some(PaymentMethod::Card),
            "cash" => Some(PaymentMethod::Cash),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentType {
    #[default]
    Studio,
    Mobile,
}

impl AppointmentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentType::Studio => "studio",
            AppointmentType::Mobile => "mobile",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "studio" => Some(AppointmentType::Studio),
            "mobile" => Some(AppointmentType::Mobile),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ServiceCategory {
    Basic,
    Deluxe,
    Premium,
}

impl ServiceCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceCategory::Basic => "basic",
            ServiceCategory::Deluxe => "deluxe",
            ServiceCategory::Premium => "premium",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "basic" => Some(ServiceCategory::Basic),
            "deluxe" => Some(ServiceCategory::Deluxe),
            "premium" => Some(ServiceCategory::Premium),
            _ => None,
        }
    }
}

/// Catalog entry. Looked up by `name` when pricing a booking.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Service {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    #[schema(value_type = String, example = "1200.00")]
    pub base_price: Decimal,
    pub duration: i32,
    pub vehicle_types: Vec<String>,
    pub category: ServiceCategory,
    pub features: Vec<String>,
    pub image_url: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Customer {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub loyalty_points: i32,
    #[schema(value_type = String, example = "0.00")]
    pub total_spent: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Booking {
    pub id: Uuid,
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
    #[schema(value_type = String, example = "2172.00")]
    pub total_price: Decimal,
    pub status: BookingStatus,
    pub payment_method: Option<PaymentMethod>,
    pub payment_status: PaymentStatus,
    pub notes: Option<String>,
    pub reference_number: String,
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    /// Notes after cancellation: prior notes are kept and a marker line appended.
    pub fn cancellation_notes(&self, reason: Option<&str>) -> String {
        let marker = match reason.map(str::trim).filter(|r| !r.is_empty()) {
            Some(reason) => format!("[Cancelled: {reason}]"),
            None => "[Cancelled by user]".to_string(),
        };
        let prior = self.notes.as_deref().unwrap_or("");
        format!("{prior}\n{marker}").trim().to_string()
    }
}

/// A booking joined with its owning customer.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BookingDetail {
    #[serde(flatten)]
    pub booking: Booking,
    pub customer: Customer,
}

/// One point per 100 currency units, rounded down.
pub fn loyalty_points_for(amount: Decimal) -> i32 {
    (amount / Decimal::ONE_HUNDRED)
        .floor()
        .to_i32()
        .unwrap_or(0)
        .max(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn pending_and_confirmed_can_move_forward() {
        use BookingStatus::*;
        for from in [Pending, Confirmed] {
            for to in [Confirmed, Completed, Cancelled] {
                assert!(from.ensure_transition(to).is_ok(), "{from} -> {to}");
            }
        }
        assert!(Pending.ensure_transition(Pending).is_ok());
    }

    #[test]
    fn confirmed_cannot_return_to_pending() {
        let err = BookingStatus::Confirmed
            .ensure_transition(BookingStatus::Pending)
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidTransition { .. }));
    }

    #[test]
    fn terminal_states_reject_every_transition() {
        for to in BookingStatus::ALL {
            let err = BookingStatus::Completed.ensure_transition(to).unwrap_err();
            match to {
                BookingStatus::Cancelled => assert!(matches!(err, AppError::CannotCancelCompleted)),
                _ => assert!(matches!(err, AppError::InvalidTransition { .. })),
            }

            let err = BookingStatus::Cancelled.ensure_transition(to).unwrap_err();
            match to {
                BookingStatus::Cancelled => assert!(matches!(err, AppError::AlreadyCancelled)),
                _ => assert!(matches!(err, AppError::InvalidTransition { .. })),
            }
        }
    }

    #[test]
    fn status_parsing_is_case_insensitive() {
        assert_eq!(BookingStatus::parse(" Confirmed "), Some(BookingStatus::Confirmed));
        assert_eq!(BookingStatus::parse("shipped"), None);
        assert_eq!(PaymentStatus::parse("PAID"), Some(PaymentStatus::Paid));
    }

    #[test]
    fn loyalty_points_round_down() {
        assert_eq!(loyalty_points_for(dec!(2172.00)), 21);
        assert_eq!(loyalty_points_for(dec!(99.99)), 0);
        assert_eq!(loyalty_points_for(dec!(100.00)), 1);
    }
}
