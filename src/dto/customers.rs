use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{Booking, Customer};

/// Only contact details are editable; loyalty and spend move with bookings.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateCustomerRequest {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CustomerList {
    pub items: Vec<Customer>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CustomerWithBookings {
    pub customer: Customer,
    pub bookings: Vec<Booking>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CustomerSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub loyalty_points: i32,
    #[schema(value_type = String)]
    pub total_spent: Decimal,
}

impl From<&Customer> for CustomerSummary {
    fn from(customer: &Customer) -> Self {
        Self {
            id: customer.id,
            name: customer.name.clone(),
            email: customer.email.clone(),
            loyalty_points: customer.loyalty_points,
            total_spent: customer.total_spent,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct LastBooking {
    pub reference_number: String,
    pub date: NaiveDate,
    pub service: String,
    #[schema(value_type = String)]
    pub amount: Decimal,
}

/// Counts and spend derived from one customer's bookings.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct BookingSummary {
    pub total_bookings: u64,
    pub completed_bookings: u64,
    pub pending_bookings: u64,
    pub confirmed_bookings: u64,
    pub cancelled_bookings: u64,
    /// Sum over completed bookings.
    #[schema(value_type = String)]
    pub total_spent: Decimal,
    #[schema(value_type = String)]
    pub average_spent: Decimal,
    pub last_booking: Option<LastBooking>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CustomerStats {
    pub customer: CustomerSummary,
    #[serde(flatten)]
    pub stats: BookingSummary,
}
