//! Price engine for detailing bookings.
//!
//! Pure functions, no store access: the caller resolves the base price from the
//! active service catalog and passes it in. Unknown vehicle types and conditions
//! price at a multiplier of 1.0 and unknown extras add nothing.

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VehicleType {
    Sedan,
    Coupe,
    Hatchback,
    Suv,
    Truck,
    Luxury,
}

impl VehicleType {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "SEDAN" => Some(VehicleType::Sedan),
            "COUPE" => Some(VehicleType::Coupe),
            "HATCHBACK" => Some(VehicleType::Hatchback),
            "SUV" => Some(VehicleType::Suv),
            "TRUCK" => Some(VehicleType::Truck),
            "LUXURY" => Some(VehicleType::Luxury),
            _ => None,
        }
    }

    pub fn multiplier(self) -> Decimal {
        match self {
            VehicleType::Sedan => dec!(1.0),
            VehicleType::Coupe => dec!(1.1),
            VehicleType::Hatchback => dec!(1.0),
            VehicleType::Suv => dec!(1.3),
            VehicleType::Truck => dec!(1.5),
            VehicleType::Luxury => dec!(1.8),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VehicleCondition {
    Light,
    Moderate,
    Heavy,
}

impl VehicleCondition {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "LIGHT" => Some(VehicleCondition::Light),
            "MODERATE" => Some(VehicleCondition::Moderate),
            "HEAVY" => Some(VehicleCondition::Heavy),
            _ => None,
        }
    }

    pub fn multiplier(self) -> Decimal {
        match self {
            VehicleCondition::Light => dec!(1.0),
            VehicleCondition::Moderate => dec!(1.2),
            VehicleCondition::Heavy => dec!(1.5),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extra {
    Interior,
    Wax,
    Engine,
}

impl Extra {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "INTERIOR" => Some(Extra::Interior),
            "WAX" => Some(Extra::Wax),
            "ENGINE" => Some(Extra::Engine),
            _ => None,
        }
    }

    pub fn price(self) -> Decimal {
        match self {
            Extra::Interior => dec!(150),
            Extra::Wax => dec!(200),
            Extra::Engine => dec!(300),
        }
    }
}

pub fn vehicle_multiplier(vehicle_type: &str) -> Decimal {
    VehicleType::parse(vehicle_type).map_or(Decimal::ONE, VehicleType::multiplier)
}

pub fn condition_multiplier(condition: Option<&str>) -> Decimal {
    condition
        .and_then(VehicleCondition::parse)
        .map_or(Decimal::ONE, VehicleCondition::multiplier)
}

pub fn extra_price(extra: &str) -> Decimal {
    Extra::parse(extra).map_or(Decimal::ZERO, Extra::price)
}

/// Trims and upper-cases extras, drops blanks and collapses duplicates.
/// First occurrence wins so the stored order follows the request.
pub fn normalize_extras(extras: &[String]) -> Vec<String> {
    let mut normalized: Vec<String> = Vec::with_capacity(extras.len());
    for extra in extras {
        let extra = extra.trim().to_ascii_uppercase();
        if !extra.is_empty() && !normalized.contains(&extra) {
            normalized.push(extra);
        }
    }
    normalized
}

/// Round to cents, halves away from zero, always carrying two decimal places.
///
/// # Examples
/// ```
/// use rust_decimal_macros::dec;
/// use aquaglow_bookings::pricing::round_money;
///
/// assert_eq!(round_money(dec!(2.005)), dec!(2.01));
/// assert_eq!(round_money(dec!(100)).to_string(), "100.00");
/// ```
pub fn round_money(amount: Decimal) -> Decimal {
    let mut rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(2);
    rounded
}

/// Breakdown of a computed price.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct PriceQuote {
    #[schema(value_type = String)]
    pub base_price: Decimal,
    #[schema(value_type = String)]
    pub vehicle_multiplier: Decimal,
    #[schema(value_type = String)]
    pub condition_multiplier: Decimal,
    #[schema(value_type = String)]
    pub extras_total: Decimal,
    #[schema(value_type = String)]
    pub total_price: Decimal,
}

/// Price a selection. The vehicle multiplier is applied before the condition
/// multiplier, extras are added after both, and the result is rounded once.
pub fn quote(
    base_price: Decimal,
    vehicle_type: &str,
    condition: Option<&str>,
    extras: &[String],
) -> PriceQuote {
    let vehicle = vehicle_multiplier(vehicle_type);
    let condition = condition_multiplier(condition);
    let extras_total: Decimal = normalize_extras(extras)
        .iter()
        .map(|extra| extra_price(extra))
        .sum();

    let total = base_price * vehicle * condition + extras_total;

    PriceQuote {
        base_price,
        vehicle_multiplier: vehicle,
        condition_multiplier: condition,
        extras_total,
        total_price: round_money(total),
    }
}

pub fn calculate_price(
    base_price: Decimal,
    vehicle_type: &str,
    condition: Option<&str>,
    extras: &[String],
) -> Decimal {
    quote(base_price, vehicle_type, condition, extras).total_price
}
