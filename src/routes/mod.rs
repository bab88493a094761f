use axum::Router;

use crate::state::AppState;

pub mod admin;
pub mod auth;
pub mod availability;
pub mod bookings;
pub mod doc;
pub mod health;
pub mod params;
pub mod vehicles;

// Build the API router without binding state; it will be provided at the top level.
pub fn create_api_router() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/vehicles", vehicles::router())
        .nest("/availability", availability::router())
        .nest("/bookings", bookings::router())
        .nest("/admin", admin::router())
}
