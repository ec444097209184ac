use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};
use uuid::Uuid;

use crate::{
    dto::customers::{CustomerList, CustomerStats, CustomerWithBookings, UpdateCustomerRequest},
    error::AppResult,
    models::Customer,
    response::ApiResponse,
    routes::params::{CustomerListQuery, SearchQuery},
    services::customer_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_customers))
        .route("/search", get(search_customers))
        .route("/email/{email}", get(get_customer_by_email))
        .route("/{id}", get(get_customer).put(update_customer))
        .route("/{id}/stats", get(customer_stats))
}

#[utoipa::path(
    get,
    path = "/api/customers",
    params(CustomerListQuery),
    responses(
        (status = 200, description = "Customers, highest spend first", body = ApiResponse<CustomerList>),
    ),
    tag = "Customers"
)]
pub async fn list_customers(
    State(state): State<AppState>,
    Query(query): Query<CustomerListQuery>,
) -> AppResult<Json<ApiResponse<CustomerList>>> {
    let resp = customer_service::list_customers(&state, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/customers/search",
    params(SearchQuery),
    responses(
        (status = 200, description = "Up to 20 matches by name", body = ApiResponse<CustomerList>),
        (status = 400, description = "Query shorter than 2 characters"),
    ),
    tag = "Customers"
)]
pub async fn search_customers(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> AppResult<Json<ApiResponse<CustomerList>>> {
    let resp = customer_service::search_customers(&state, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/customers/email/{email}",
    params(("email" = String, Path, description = "Customer email, case-insensitive")),
    responses(
        (status = 200, description = "Customer with active and completed bookings", body = ApiResponse<CustomerWithBookings>),
        (status = 404, description = "Not Found"),
    ),
    tag = "Customers"
)]
pub async fn get_customer_by_email(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> AppResult<Json<ApiResponse<CustomerWithBookings>>> {
    let resp = customer_service::get_customer_by_email(&state, &email).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/customers/{id}",
    params(("id" = Uuid, Path, description = "Customer ID")),
    responses(
        (status = 200, description = "Customer with recent bookings", body = ApiResponse<CustomerWithBookings>),
        (status = 404, description = "Not Found"),
    ),
    tag = "Customers"
)]
pub async fn get_customer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<CustomerWithBookings>>> {
    let resp = customer_service::get_customer(&state, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/customers/{id}",
    params(("id" = Uuid, Path, description = "Customer ID")),
    request_body = UpdateCustomerRequest,
    responses(
        (status = 200, description = "Customer updated", body = ApiResponse<Customer>),
        (status = 400, description = "Validation failed"),
        (status = 404, description = "Not Found"),
    ),
    tag = "Customers"
)]
pub async fn update_customer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateCustomerRequest>,
) -> AppResult<Json<ApiResponse<Customer>>> {
    let resp = customer_service::update_customer(&state, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/customers/{id}/stats",
    params(("id" = Uuid, Path, description = "Customer ID")),
    responses(
        (status = 200, description = "Customer booking statistics", body = ApiResponse<CustomerStats>),
        (status = 404, description = "Not Found"),
    ),
    tag = "Customers"
)]
pub async fn customer_stats(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<CustomerStats>>> {
    let resp = customer_service::customer_stats(&state, id).await?;
    Ok(Json(resp))
}
