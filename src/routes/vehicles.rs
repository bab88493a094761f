use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, patch},
};
use uuid::Uuid;

use crate::{
    dto::vehicles::{CreateVehicleRequest, SetActiveRequest, UpdateCapacityRequest, VehicleList},
    error::AppResult,
    middleware::auth::AuthUser,
    models::Vehicle,
    response::ApiResponse,
    routes::params::VehicleQuery,
    services::inventory_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_vehicles).post(create_vehicle))
        .route("/{id}", get(get_vehicle).delete(delete_vehicle))
        .route("/{id}/active", patch(set_active))
        .route("/{id}/capacity", patch(update_capacity))
}

#[utoipa::path(
    get,
    path = "/api/vehicles",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20, max 100"),
        ("location" = Option<String>, Query, description = "Filter by location"),
        ("category" = Option<String>, Query, description = "Filter by category")
    ),
    responses(
        (status = 200, description = "Bookable vehicles", body = ApiResponse<VehicleList>)
    ),
    tag = "Vehicles"
)]
pub async fn list_vehicles(
    State(state): State<AppState>,
    Query(query): Query<VehicleQuery>,
) -> AppResult<Json<ApiResponse<VehicleList>>> {
    let resp = inventory_service::list_vehicles(&state, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/vehicles",
    request_body = CreateVehicleRequest,
    responses(
        (status = 201, description = "Vehicle submitted for review", body = ApiResponse<Vehicle>),
        (status = 400, description = "Invalid payload"),
        (status = 403, description = "Partners and admins only")
    ),
    security(("bearer_auth" = [])),
    tag = "Vehicles"
)]
pub async fn create_vehicle(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateVehicleRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<Vehicle>>)> {
    let resp = inventory_service::create_vehicle(&state, &user, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    get,
    path = "/api/vehicles/{id}",
    params(("id" = Uuid, Path, description = "Vehicle id")),
    responses(
        (status = 200, description = "Vehicle", body = ApiResponse<Vehicle>),
        (status = 404, description = "Vehicle not found")
    ),
    tag = "Vehicles"
)]
pub async fn get_vehicle(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Vehicle>>> {
    let resp = inventory_service::get_vehicle(&state, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    patch,
    path = "/api/vehicles/{id}/active",
    params(("id" = Uuid, Path, description = "Vehicle id")),
    request_body = SetActiveRequest,
    responses(
        (status = 200, description = "Vehicle updated", body = ApiResponse<Vehicle>),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Vehicle not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Vehicles"
)]
pub async fn set_active(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<SetActiveRequest>,
) -> AppResult<Json<ApiResponse<Vehicle>>> {
    let resp = inventory_service::set_vehicle_active(&state, &user, id, payload.active).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    patch,
    path = "/api/vehicles/{id}/capacity",
    params(("id" = Uuid, Path, description = "Vehicle id")),
    request_body = UpdateCapacityRequest,
    responses(
        (status = 200, description = "Capacity updated", body = ApiResponse<Vehicle>),
        (status = 400, description = "Capacity below 1"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Vehicle not found"),
        (status = 503, description = "Vehicle is busy, retry")
    ),
    security(("bearer_auth" = [])),
    tag = "Vehicles"
)]
pub async fn update_capacity(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateCapacityRequest>,
) -> AppResult<Json<ApiResponse<Vehicle>>> {
    let resp = inventory_service::update_capacity(&state, &user, id, payload.capacity).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/vehicles/{id}",
    params(("id" = Uuid, Path, description = "Vehicle id")),
    responses(
        (status = 200, description = "Vehicle deleted"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Vehicle not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Vehicles"
)]
pub async fn delete_vehicle(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = inventory_service::delete_vehicle(&state, &user, id).await?;
    Ok(Json(resp))
}
