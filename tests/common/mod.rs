#![allow(dead_code)]

use std::time::Duration;

use chrono::{NaiveDate, Utc};
use fleet_booking_api::{
    config::BookingSettings,
    db::{create_orm_conn, run_migrations},
    domain::{ListingState, Role},
    dto::bookings::{CreateBookingRequest, PaymentFlow},
    entity::{users::ActiveModel as UserActive, vehicles::ActiveModel as VehicleActive},
    middleware::auth::AuthUser,
    notify::Notifier,
    state::AppState,
};
use rust_decimal::Decimal;
use sea_orm::ActiveValue::NotSet;
use sea_orm::{ActiveModelTrait, Set};
use uuid::Uuid;

/// `None` when no database is configured; callers skip in that case.
pub fn database_url() -> Option<String> {
    match std::env::var("TEST_DATABASE_URL").or_else(|_| std::env::var("DATABASE_URL")) {
        Ok(url) => Some(url),
        Err(_) => {
            eprintln!(
                "Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run integration tests."
            );
            None
        }
    }
}

pub fn fast_settings() -> BookingSettings {
    BookingSettings {
        max_attempts: 5,
        retry_base_delay: Duration::from_millis(5),
        lock_timeout: Duration::from_millis(5000),
    }
}

pub async fn setup_state(database_url: &str, notifier: Notifier) -> anyhow::Result<AppState> {
    setup_state_with(database_url, notifier, fast_settings()).await
}

pub async fn setup_state_with(
    database_url: &str,
    notifier: Notifier,
    settings: BookingSettings,
) -> anyhow::Result<AppState> {
    let orm = create_orm_conn(database_url).await?;
    run_migrations(&orm).await?;
    Ok(AppState::new(orm, notifier, settings))
}

/// Every test works on its own users and vehicles, so nothing is truncated.
pub async fn create_user(state: &AppState, role: Role) -> anyhow::Result<AuthUser> {
    let user = UserActive {
        id: Set(Uuid::new_v4()),
        email: Set(format!("{}-{}@example.test", role, Uuid::new_v4())),
        password_hash: Set("dummy".into()),
        role: Set(role),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    Ok(AuthUser {
        user_id: user.id,
        role,
    })
}

pub struct VehicleSpec {
    pub capacity: i32,
    pub daily: i64,
    pub weekly: Option<i64>,
    pub monthly: Option<i64>,
    pub min_rental_days: i32,
    pub listing_state: ListingState,
}

impl Default for VehicleSpec {
    fn default() -> Self {
        Self {
            capacity: 1,
            daily: 100,
            weekly: Some(600),
            monthly: Some(2400),
            min_rental_days: 1,
            listing_state: ListingState::Approved,
        }
    }
}

pub async fn create_vehicle(
    state: &AppState,
    owner: &AuthUser,
    spec: VehicleSpec,
) -> anyhow::Result<Uuid> {
    let vehicle = VehicleActive {
        id: Set(Uuid::new_v4()),
        owner_id: Set(owner.user_id),
        brand: Set("Toyota".into()),
        vehicle_model: Set("Corolla".into()),
        year: Set(2024),
        category: Set("Compact".into()),
        location: Set("Kyrenia".into()),
        capacity: Set(spec.capacity),
        listing_state: Set(spec.listing_state),
        active: Set(true),
        daily_rate: Set(Decimal::from(spec.daily)),
        weekly_rate: Set(spec.weekly.map(Decimal::from)),
        monthly_rate: Set(spec.monthly.map(Decimal::from)),
        min_rental_days: Set(spec.min_rental_days),
        deleted_at: Set(None),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    Ok(vehicle.id)
}

/// `offset` days from today (UTC).
pub fn day(offset: i64) -> NaiveDate {
    Utc::now().date_naive() + chrono::Duration::days(offset)
}

pub fn booking_request(vehicle_id: Uuid, start: i64, end: i64) -> CreateBookingRequest {
    CreateBookingRequest {
        vehicle_id,
        start_date: day(start),
        end_date: day(end),
        pickup_location: "Kyrenia Harbour".into(),
        dropoff_location: "Ercan Airport".into(),
        payment_flow: PaymentFlow::PayAtPickup,
        customer_id: None,
    }
}
