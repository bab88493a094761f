use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, patch, post},
};
use uuid::Uuid;

use crate::{
    dto::{
        bookings::{BookingList, RecordPaymentRequest},
        vehicles::ReviewVehicleRequest,
    },
    error::AppResult,
    middleware::auth::AuthUser,
    models::{Booking, Vehicle},
    response::ApiResponse,
    routes::params::BookingListQuery,
    services::{booking_service, inventory_service},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/bookings", get(list_all_bookings))
        .route("/bookings/{id}/payment", post(record_payment))
        .route("/vehicles/{id}/review", patch(review_vehicle))
}

#[utoipa::path(
    get,
    path = "/api/admin/bookings",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
        ("status" = Option<String>, Query, description = "Filter by booking status"),
        ("vehicle_id" = Option<Uuid>, Query, description = "Filter by vehicle"),
        ("sort_order" = Option<String>, Query, description = "Sort order: asc, desc")
    ),
    responses(
        (status = 200, description = "All bookings (admin only)", body = ApiResponse<BookingList>),
        (status = 403, description = "Forbidden"),
        (status = 500, description = "Internal Server Error"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn list_all_bookings(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<BookingListQuery>,
) -> AppResult<Json<ApiResponse<BookingList>>> {
    let resp = booking_service::list_all_bookings(&state, &user, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/admin/bookings/{id}/payment",
    params(("id" = Uuid, Path, description = "Booking id")),
    request_body = RecordPaymentRequest,
    responses(
        (status = 200, description = "Payment outcome recorded", body = ApiResponse<Booking>),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Booking not found"),
        (status = 409, description = "Outcome not allowed from the current payment status")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn record_payment(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<RecordPaymentRequest>,
) -> AppResult<Json<ApiResponse<Booking>>> {
    let resp = booking_service::record_payment(&state, &user, id, payload.outcome).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    patch,
    path = "/api/admin/vehicles/{id}/review",
    params(("id" = Uuid, Path, description = "Vehicle id")),
    request_body = ReviewVehicleRequest,
    responses(
        (status = 200, description = "Vehicle approved or rejected", body = ApiResponse<Vehicle>),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Vehicle not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn review_vehicle(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<ReviewVehicleRequest>,
) -> AppResult<Json<ApiResponse<Vehicle>>> {
    let resp = inventory_service::review_vehicle(&state, &user, id, payload.decision).await?;
    Ok(Json(resp))
}
