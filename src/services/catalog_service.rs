use rust_decimal::Decimal;
use serde_json::json;
use uuid::Uuid;

use crate::{
    audit::{self, AuditEntry},
    dto::services::{
        CreateServiceRequest, PricePreview, PricePreviewRequest, ServiceList, UpdateServiceRequest,
    },
    error::{AppError, AppResult},
    models::{Service, ServiceCategory},
    pricing,
    response::ApiResponse,
    state::AppState,
    store::{NewService, ServiceChanges},
};

const MIN_DURATION_MINUTES: i32 = 15;

/// Active services, cheapest first.
pub async fn list_services(state: &AppState) -> AppResult<ApiResponse<ServiceList>> {
    let items = state.store.list_services(true).await?;
    Ok(ApiResponse::ok("Services", ServiceList { items }))
}

pub async fn get_service(state: &AppState, id: Uuid) -> AppResult<ApiResponse<Service>> {
    let service = state
        .store
        .find_service(id)
        .await?
        .ok_or(AppError::NotFound("Service"))?;
    Ok(ApiResponse::ok("Service", service))
}

fn check_name(name: &str, errors: &mut Vec<String>) {
    let len = name.chars().count();
    if !(2..=100).contains(&len) {
        errors.push("name must be between 2 and 100 characters".to_string());
    }
}

fn check_description(description: &str, errors: &mut Vec<String>) {
    if description.chars().count() < 10 {
        errors.push("description must be at least 10 characters".to_string());
    }
}

fn check_price(price: Decimal, errors: &mut Vec<String>) {
    if price < Decimal::ZERO {
        errors.push("base_price cannot be negative".to_string());
    }
}

fn check_duration(duration: i32, errors: &mut Vec<String>) {
    if duration < MIN_DURATION_MINUTES {
        errors.push(format!(
            "duration must be at least {MIN_DURATION_MINUTES} minutes"
        ));
    }
}

fn check_category(raw: &str, errors: &mut Vec<String>) -> Option<ServiceCategory> {
    let category = ServiceCategory::parse(raw);
    if category.is_none() {
        errors.push("category must be one of: basic, deluxe, premium".to_string());
    }
    category
}

pub async fn create_service(
    state: &AppState,
    payload: CreateServiceRequest,
) -> AppResult<ApiResponse<Service>> {
    let name = payload.name.trim().to_string();
    let description = payload.description.trim().to_string();

    let mut errors = Vec::new();
    check_name(&name, &mut errors);
    check_description(&description, &mut errors);
    check_price(payload.base_price, &mut errors);
    check_duration(payload.duration, &mut errors);
    let category = check_category(&payload.category, &mut errors);
    let Some(category) = category.filter(|_| errors.is_empty()) else {
        return Err(AppError::Validation(errors));
    };

    let service = state
        .store
        .create_service(NewService {
            name,
            description,
            base_price: pricing::round_money(payload.base_price),
            duration: payload.duration,
            vehicle_types: payload.vehicle_types,
            category,
            features: payload.features,
            image_url: payload.image_url,
            active: payload.active.unwrap_or(true),
        })
        .await?;

    tracing::info!(service_id = %service.id, name = %service.name, "service created");
    audit::record(
        state,
        AuditEntry::new("service_created", "services", service.id)
            .with_metadata(json!({ "name": service.name })),
    )
    .await;

    Ok(ApiResponse::ok("Service created", service))
}

/// Partial update. Past bookings keep the price they were created with.
pub async fn update_service(
    state: &AppState,
    id: Uuid,
    payload: UpdateServiceRequest,
) -> AppResult<ApiResponse<Service>> {
    let name = payload.name.map(|n| n.trim().to_string());
    let description = payload.description.map(|d| d.trim().to_string());

    let mut errors = Vec::new();
    if let Some(name) = name.as_deref() {
        check_name(name, &mut errors);
    }
    if let Some(description) = description.as_deref() {
        check_description(description, &mut errors);
    }
    if let Some(price) = payload.base_price {
        check_price(price, &mut errors);
    }
    if let Some(duration) = payload.duration {
        check_duration(duration, &mut errors);
    }
    let category = match payload.category.as_deref() {
        Some(raw) => check_category(raw, &mut errors),
        None => None,
    };
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    let changes = ServiceChanges {
        name,
        description,
        base_price: payload.base_price.map(pricing::round_money),
        duration: payload.duration,
        vehicle_types: payload.vehicle_types,
        category,
        features: payload.features,
        image_url: payload.image_url,
        active: payload.active,
    };
    let service = state.store.update_service(id, changes).await?;

    audit::record(
        state,
        AuditEntry::new("service_updated", "services", service.id)
            .with_metadata(json!({ "name": service.name, "active": service.active })),
    )
    .await;

    Ok(ApiResponse::ok("Service updated", service))
}

/// Soft delete: the service stops being listed and priceable.
pub async fn delete_service(state: &AppState, id: Uuid) -> AppResult<ApiResponse<Service>> {
    let changes = ServiceChanges {
        active: Some(false),
        ..ServiceChanges::default()
    };
    let service = state.store.update_service(id, changes).await?;

    tracing::info!(service_id = %service.id, "service deactivated");
    audit::record(
        state,
        AuditEntry::new("service_deactivated", "services", service.id),
    )
    .await;

    Ok(ApiResponse::ok("Service deactivated", service))
}

/// Prices a selection without creating a booking.
pub async fn preview_price(
    state: &AppState,
    payload: PricePreviewRequest,
) -> AppResult<ApiResponse<PricePreview>> {
    let service_type = payload.service_type.trim();
    let service = state
        .store
        .find_service_by_name(service_type)
        .await?
        .ok_or_else(|| AppError::ServiceNotFound(service_type.to_string()))?;

    let quote = pricing::quote(
        service.base_price,
        &payload.vehicle_type,
        payload.condition.as_deref(),
        &payload.extras,
    );

    Ok(ApiResponse::ok(
        "Price calculated",
        PricePreview {
            service_type: service.name,
            quote,
        },
    ))
}
