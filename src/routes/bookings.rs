use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, patch},
};
use uuid::Uuid;

use crate::{
    dto::bookings::{
        BookingList, BookingStats, BookingTransition, CancelBookingRequest, CreateBookingRequest,
        SlotAvailability, UpdatePaymentRequest, UpdateStatusRequest,
    },
    error::AppResult,
    models::BookingDetail,
    response::ApiResponse,
    routes::params::{BookingListQuery, SlotQuery},
    services::booking_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_bookings).post(create_booking))
        .route("/stats", get(booking_stats))
        .route("/available-slots", get(available_slots))
        .route("/reference/{reference}", get(get_booking_by_reference))
        .route("/{id}", get(get_booking))
        .route("/{id}/status", patch(update_status))
        .route("/{id}/payment", patch(update_payment))
        .route("/{id}/cancel", patch(cancel_booking))
}

#[utoipa::path(
    post,
    path = "/api/bookings",
    request_body = CreateBookingRequest,
    responses(
        (status = 201, description = "Booking created", body = ApiResponse<BookingDetail>),
        (status = 400, description = "Validation failed"),
        (status = 404, description = "Service not found"),
        (status = 409, description = "Slot already booked"),
    ),
    tag = "Bookings"
)]
pub async fn create_booking(
    State(state): State<AppState>,
    Json(payload): Json<CreateBookingRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<BookingDetail>>)> {
    let resp = booking_service::create_booking(&state, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    get,
    path = "/api/bookings",
    params(BookingListQuery),
    responses(
        (status = 200, description = "Bookings, most recent date first", body = ApiResponse<BookingList>),
        (status = 400, description = "Invalid filter"),
    ),
    tag = "Bookings"
)]
pub async fn list_bookings(
    State(state): State<AppState>,
    Query(query): Query<BookingListQuery>,
) -> AppResult<Json<ApiResponse<BookingList>>> {
    let resp = booking_service::list_bookings(&state, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/bookings/stats",
    responses(
        (status = 200, description = "Booking statistics", body = ApiResponse<BookingStats>),
    ),
    tag = "Bookings"
)]
pub async fn booking_stats(
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<BookingStats>>> {
    let resp = booking_service::booking_stats(&state).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/bookings/available-slots",
    params(SlotQuery),
    responses(
        (status = 200, description = "Free and taken slots for the day", body = ApiResponse<SlotAvailability>),
        (status = 400, description = "Missing or malformed date"),
    ),
    tag = "Bookings"
)]
pub async fn available_slots(
    State(state): State<AppState>,
    Query(query): Query<SlotQuery>,
) -> AppResult<Json<ApiResponse<SlotAvailability>>> {
    let resp = booking_service::available_slots(&state, query.date.as_deref()).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/bookings/reference/{reference}",
    params(("reference" = String, Path, description = "Reference number, e.g. AG-1767225600000-3F9A1C")),
    responses(
        (status = 200, description = "Booking", body = ApiResponse<BookingDetail>),
        (status = 404, description = "Not Found"),
    ),
    tag = "Bookings"
)]
pub async fn get_booking_by_reference(
    State(state): State<AppState>,
    Path(reference): Path<String>,
) -> AppResult<Json<ApiResponse<BookingDetail>>> {
    let resp = booking_service::get_booking_by_reference(&state, &reference).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/bookings/{id}",
    params(("id" = Uuid, Path, description = "Booking ID")),
    responses(
        (status = 200, description = "Booking", body = ApiResponse<BookingDetail>),
        (status = 404, description = "Not Found"),
    ),
    tag = "Bookings"
)]
pub async fn get_booking(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<BookingDetail>>> {
    let resp = booking_service::get_booking(&state, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    patch,
    path = "/api/bookings/{id}/status",
    params(("id" = Uuid, Path, description = "Booking ID")),
    request_body = UpdateStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = ApiResponse<BookingTransition>),
        (status = 400, description = "Invalid transition"),
        (status = 404, description = "Not Found"),
        (status = 409, description = "Booking changed concurrently"),
    ),
    tag = "Bookings"
)]
pub async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateStatusRequest>,
) -> AppResult<Json<ApiResponse<BookingTransition>>> {
    let resp = booking_service::update_booking_status(&state, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    patch,
    path = "/api/bookings/{id}/payment",
    params(("id" = Uuid, Path, description = "Booking ID")),
    request_body = UpdatePaymentRequest,
    responses(
        (status = 200, description = "Payment status updated", body = ApiResponse<BookingTransition>),
        (status = 400, description = "Invalid payment status"),
        (status = 404, description = "Not Found"),
    ),
    tag = "Bookings"
)]
pub async fn update_payment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdatePaymentRequest>,
) -> AppResult<Json<ApiResponse<BookingTransition>>> {
    let resp = booking_service::update_payment_status(&state, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    patch,
    path = "/api/bookings/{id}/cancel",
    params(("id" = Uuid, Path, description = "Booking ID")),
    request_body = CancelBookingRequest,
    responses(
        (status = 200, description = "Booking cancelled", body = ApiResponse<BookingDetail>),
        (status = 400, description = "Already cancelled or completed"),
        (status = 404, description = "Not Found"),
    ),
    tag = "Bookings"
)]
pub async fn cancel_booking(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CancelBookingRequest>,
) -> AppResult<Json<ApiResponse<BookingDetail>>> {
    let resp = booking_service::cancel_booking(&state, id, payload).await?;
    Ok(Json(resp))
}
