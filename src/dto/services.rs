use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{models::Service, pricing::PriceQuote};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateServiceRequest {
    pub name: String,
    pub description: String,
    #[schema(value_type = String, example = "1200.00")]
    pub base_price: Decimal,
    /// Minutes.
    pub duration: i32,
    #[serde(default)]
    pub vehicle_types: Vec<String>,
    #[schema(example = "premium")]
    pub category: String,
    #[serde(default)]
    pub features: Vec<String>,
    pub image_url: Option<String>,
    pub active: Option<bool>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateServiceRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    #[schema(value_type = Option<String>)]
    pub base_price: Option<Decimal>,
    pub duration: Option<i32>,
    pub vehicle_types: Option<Vec<String>>,
    pub category: Option<String>,
    pub features: Option<Vec<String>>,
    pub image_url: Option<String>,
    pub active: Option<bool>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ServiceList {
    pub items: Vec<Service>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PricePreviewRequest {
    #[schema(example = "Full Detail")]
    pub service_type: String,
    #[schema(example = "SUV")]
    pub vehicle_type: String,
    pub condition: Option<String>,
    #[serde(default)]
    pub extras: Vec<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PricePreview {
    pub service_type: String,
    #[serde(flatten)]
    pub quote: PriceQuote,
}
