use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::Vehicle;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateVehicleRequest {
    pub brand: String,
    pub vehicle_model: String,
    pub year: i32,
    pub category: String,
    pub location: String,
    /// Interchangeable units under this listing. Defaults to 1.
    pub capacity: Option<i32>,
    pub daily_rate: Decimal,
    pub weekly_rate: Option<Decimal>,
    pub monthly_rate: Option<Decimal>,
    pub min_rental_days: Option<i32>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SetActiveRequest {
    pub active: bool,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateCapacityRequest {
    pub capacity: i32,
}

#[derive(Debug, Clone, Copy, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ReviewDecision {
    Approve,
    Reject,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ReviewVehicleRequest {
    pub decision: ReviewDecision,
}

#[derive(Serialize, ToSchema)]
pub struct VehicleList {
    pub items: Vec<Vehicle>,
}
