use axum::{
    Json, Router,
    extract::{Query, State},
    routing::get,
};

use crate::{
    dto::bookings::AvailabilityQuery,
    error::AppResult,
    models::Availability,
    response::ApiResponse,
    services::availability_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(check_availability))
}

/// Advisory snapshot; a later booking attempt can still be refused.
#[utoipa::path(
    get,
    path = "/api/availability",
    params(
        ("vehicle_id" = String, Query, description = "Vehicle id (UUID)"),
        ("start_date" = String, Query, description = "First rental day, YYYY-MM-DD"),
        ("end_date" = String, Query, description = "Return day (exclusive), YYYY-MM-DD")
    ),
    responses(
        (status = 200, description = "Availability for the range", body = ApiResponse<Availability>),
        (status = 400, description = "Invalid interval"),
        (status = 404, description = "Vehicle not found")
    ),
    tag = "Availability"
)]
pub async fn check_availability(
    State(state): State<AppState>,
    Query(query): Query<AvailabilityQuery>,
) -> AppResult<Json<ApiResponse<Availability>>> {
    let resp = availability_service::check_availability(&state, query).await?;
    Ok(Json(resp))
}
