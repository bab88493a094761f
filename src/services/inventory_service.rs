use std::time::Duration;

use chrono::Utc;
use sea_orm::sea_query::LockType;
use sea_orm::ActiveValue::NotSet;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit,
    db::{OrmConn, set_lock_timeout},
    domain::{ListingState, RateTable},
    dto::vehicles::{CreateVehicleRequest, ReviewDecision, VehicleList},
    entity::vehicles::{
        ActiveModel as VehicleActive, Column as VehicleCol, Entity as Vehicles,
        Model as VehicleModel,
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin, ensure_partner_or_admin},
    models::Vehicle,
    response::{ApiResponse, Meta},
    routes::params::VehicleQuery,
    state::AppState,
};

/// Approved and switched on. Soft-deleted vehicles never resolve at all.
pub fn is_bookable(vehicle: &VehicleModel) -> bool {
    vehicle.active
        && vehicle.listing_state == ListingState::Approved
        && vehicle.deleted_at.is_none()
}

pub fn capacity_of(vehicle: &VehicleModel) -> i32 {
    vehicle.capacity
}

pub fn rate_table(vehicle: &VehicleModel) -> RateTable {
    RateTable::new(vehicle.daily_rate, vehicle.weekly_rate, vehicle.monthly_rate)
}

/// Live (not soft-deleted) vehicle, or `VehicleNotFound`.
pub async fn find_vehicle<C: ConnectionTrait>(conn: &C, id: Uuid) -> AppResult<VehicleModel> {
    Vehicles::find_by_id(id)
        .filter(VehicleCol::DeletedAt.is_null())
        .one(conn)
        .await?
        .ok_or(AppError::VehicleNotFound(id))
}

/// Same as [`find_vehicle`] but holds the row lock until the transaction ends.
/// Every admission for the vehicle queues behind this lock.
pub async fn lock_vehicle<C: ConnectionTrait>(conn: &C, id: Uuid) -> AppResult<VehicleModel> {
    Vehicles::find_by_id(id)
        .filter(VehicleCol::DeletedAt.is_null())
        .lock(LockType::Update)
        .one(conn)
        .await?
        .ok_or(AppError::VehicleNotFound(id))
}

fn ensure_can_manage(user: &AuthUser, vehicle: &VehicleModel) -> AppResult<()> {
    if user.is_admin() || vehicle.owner_id == user.user_id {
        Ok(())
    } else {
        Err(AppError::Forbidden)
    }
}

fn validate_capacity(capacity: i32) -> AppResult<()> {
    if capacity < 1 {
        return Err(AppError::BadRequest("capacity must be at least 1".into()));
    }
    Ok(())
}

pub async fn create_vehicle(
    state: &AppState,
    user: &AuthUser,
    payload: CreateVehicleRequest,
) -> AppResult<ApiResponse<Vehicle>> {
    ensure_partner_or_admin(user)?;

    let capacity = payload.capacity.unwrap_or(1);
    validate_capacity(capacity)?;
    let min_rental_days = payload.min_rental_days.unwrap_or(1);
    if min_rental_days < 1 {
        return Err(AppError::BadRequest("min_rental_days must be at least 1".into()));
    }
    RateTable::new(payload.daily_rate, payload.weekly_rate, payload.monthly_rate).validate()?;
    if payload.brand.trim().is_empty() || payload.vehicle_model.trim().is_empty() {
        return Err(AppError::BadRequest("brand and vehicle_model are required".into()));
    }

    let vehicle = VehicleActive {
        id: Set(Uuid::new_v4()),
        owner_id: Set(user.user_id),
        brand: Set(payload.brand),
        vehicle_model: Set(payload.vehicle_model),
        year: Set(payload.year),
        category: Set(payload.category),
        location: Set(payload.location),
        capacity: Set(capacity),
        listing_state: Set(ListingState::Pending),
        active: Set(true),
        daily_rate: Set(payload.daily_rate),
        weekly_rate: Set(payload.weekly_rate),
        monthly_rate: Set(payload.monthly_rate),
        min_rental_days: Set(min_rental_days),
        deleted_at: Set(None),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    audit::record(
        &state.orm,
        user.user_id,
        "vehicle_create",
        "vehicles",
        serde_json::json!({ "vehicle_id": vehicle.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Vehicle submitted for review",
        vehicle_from_entity(vehicle),
        Some(Meta::empty()),
    ))
}

pub async fn get_vehicle(state: &AppState, id: Uuid) -> AppResult<ApiResponse<Vehicle>> {
    let vehicle = find_vehicle(&state.orm, id).await?;
    Ok(ApiResponse::success("Vehicle", vehicle_from_entity(vehicle), None))
}

/// Public catalogue: only vehicles a customer could book right now.
pub async fn list_vehicles(
    state: &AppState,
    query: VehicleQuery,
) -> AppResult<ApiResponse<VehicleList>> {
    let (page, limit, offset) = query.pagination().normalize();
    let mut condition = Condition::all()
        .add(VehicleCol::DeletedAt.is_null())
        .add(VehicleCol::Active.eq(true))
        .add(VehicleCol::ListingState.eq(ListingState::Approved));

    if let Some(location) = query.location.as_ref().filter(|s| !s.is_empty()) {
        condition = condition.add(VehicleCol::Location.eq(location.clone()));
    }
    if let Some(category) = query.category.as_ref().filter(|s| !s.is_empty()) {
        condition = condition.add(VehicleCol::Category.eq(category.clone()));
    }

    let finder = Vehicles::find()
        .filter(condition)
        .order_by_desc(VehicleCol::CreatedAt);

    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(vehicle_from_entity)
        .collect();

    Ok(ApiResponse::page(
        "Vehicles",
        VehicleList { items },
        Meta::new(page, limit, total),
    ))
}

pub async fn review_vehicle(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    decision: ReviewDecision,
) -> AppResult<ApiResponse<Vehicle>> {
    ensure_admin(user)?;
    let vehicle = find_vehicle(&state.orm, id).await?;

    let listing_state = match decision {
        ReviewDecision::Approve => ListingState::Approved,
        ReviewDecision::Reject => ListingState::Rejected,
    };

    let mut active: VehicleActive = vehicle.into();
    active.listing_state = Set(listing_state);
    active.updated_at = Set(Utc::now().into());
    let vehicle = active.update(&state.orm).await?;

    tracing::info!(vehicle_id = %vehicle.id, state = ?listing_state, "vehicle reviewed");
    audit::record(
        &state.orm,
        user.user_id,
        "vehicle_review",
        "vehicles",
        serde_json::json!({
            "vehicle_id": vehicle.id,
            "approved": listing_state == ListingState::Approved,
        }),
    )
    .await;

    Ok(ApiResponse::success(
        "Vehicle reviewed",
        vehicle_from_entity(vehicle),
        Some(Meta::empty()),
    ))
}

pub async fn set_vehicle_active(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    active_flag: bool,
) -> AppResult<ApiResponse<Vehicle>> {
    let vehicle = find_vehicle(&state.orm, id).await?;
    ensure_can_manage(user, &vehicle)?;

    let mut active: VehicleActive = vehicle.into();
    active.active = Set(active_flag);
    active.updated_at = Set(Utc::now().into());
    let vehicle = active.update(&state.orm).await?;

    audit::record(
        &state.orm,
        user.user_id,
        "vehicle_set_active",
        "vehicles",
        serde_json::json!({ "vehicle_id": vehicle.id, "active": active_flag }),
    )
    .await;

    Ok(ApiResponse::success(
        "Vehicle updated",
        vehicle_from_entity(vehicle),
        Some(Meta::empty()),
    ))
}

async fn apply_capacity(
    orm: &OrmConn,
    lock_timeout: Duration,
    user: &AuthUser,
    id: Uuid,
    capacity: i32,
) -> AppResult<VehicleModel> {
    let txn = orm.begin().await?;
    set_lock_timeout(&txn, lock_timeout).await?;
    let vehicle = lock_vehicle(&txn, id).await?;
    ensure_can_manage(user, &vehicle)?;

    let mut active: VehicleActive = vehicle.into();
    active.capacity = Set(capacity);
    active.updated_at = Set(Utc::now().into());
    let vehicle = active.update(&txn).await?;

    txn.commit().await?;
    Ok(vehicle)
}

/// Changes fleet size under the same row lock admissions take. Lowering it
/// does not touch existing bookings, it only limits new ones.
pub async fn update_capacity(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    capacity: i32,
) -> AppResult<ApiResponse<Vehicle>> {
    validate_capacity(capacity)?;

    let orm = &state.orm;
    let lock_timeout = state.booking.lock_timeout;
    let vehicle = state
        .booking
        .retry_policy()
        .run("update_capacity", AppError::is_transient, move |_| {
            apply_capacity(orm, lock_timeout, user, id, capacity)
        })
        .await?;

    audit::record(
        &state.orm,
        user.user_id,
        "vehicle_capacity",
        "vehicles",
        serde_json::json!({ "vehicle_id": vehicle.id, "capacity": capacity }),
    )
    .await;

    Ok(ApiResponse::success(
        "Capacity updated",
        vehicle_from_entity(vehicle),
        Some(Meta::empty()),
    ))
}

async fn apply_delete(
    orm: &OrmConn,
    lock_timeout: Duration,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<()> {
    let txn = orm.begin().await?;
    set_lock_timeout(&txn, lock_timeout).await?;
    let vehicle = lock_vehicle(&txn, id).await?;
    ensure_can_manage(user, &vehicle)?;

    let now = Utc::now();
    let mut active: VehicleActive = vehicle.into();
    active.active = Set(false);
    active.deleted_at = Set(Some(now.into()));
    active.updated_at = Set(now.into());
    active.update(&txn).await?;

    txn.commit().await?;
    Ok(())
}

/// Soft delete. Bookings keep referencing the row.
pub async fn delete_vehicle(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let orm = &state.orm;
    let lock_timeout = state.booking.lock_timeout;
    state
        .booking
        .retry_policy()
        .run("delete_vehicle", AppError::is_transient, move |_| {
            apply_delete(orm, lock_timeout, user, id)
        })
        .await?;

    audit::record(
        &state.orm,
        user.user_id,
        "vehicle_delete",
        "vehicles",
        serde_json::json!({ "vehicle_id": id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

pub(crate) fn vehicle_from_entity(model: VehicleModel) -> Vehicle {
    Vehicle {
        id: model.id,
        owner_id: model.owner_id,
        brand: model.brand,
        vehicle_model: model.vehicle_model,
        year: model.year,
        category: model.category,
        location: model.location,
        capacity: model.capacity,
        listing_state: model.listing_state,
        active: model.active,
        daily_rate: model.daily_rate,
        weekly_rate: model.weekly_rate,
        monthly_rate: model.monthly_rate,
        min_rental_days: model.min_rental_days,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;
    use crate::domain::Role;

    fn vehicle(owner_id: Uuid) -> VehicleModel {
        let now = Utc::now().into();
        VehicleModel {
            id: Uuid::new_v4(),
            owner_id,
            brand: "Toyota".into(),
            vehicle_model: "Yaris".into(),
            year: 2023,
            category: "Economy".into(),
            location: "Kyrenia".into(),
            capacity: 2,
            listing_state: ListingState::Approved,
            active: true,
            daily_rate: Decimal::from(40),
            weekly_rate: None,
            monthly_rate: None,
            min_rental_days: 1,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn bookable_requires_approval_and_active_flag() {
        let owner = Uuid::new_v4();
        assert!(is_bookable(&vehicle(owner)));

        let mut pending = vehicle(owner);
        pending.listing_state = ListingState::Pending;
        assert!(!is_bookable(&pending));

        let mut rejected = vehicle(owner);
        rejected.listing_state = ListingState::Rejected;
        assert!(!is_bookable(&rejected));

        let mut inactive = vehicle(owner);
        inactive.active = false;
        assert!(!is_bookable(&inactive));

        let mut deleted = vehicle(owner);
        deleted.deleted_at = Some(Utc::now().into());
        assert!(!is_bookable(&deleted));
    }

    #[test]
    fn capacity_and_rates_come_from_the_row() {
        let v = vehicle(Uuid::new_v4());
        assert_eq!(capacity_of(&v), 2);
        assert_eq!(rate_table(&v).daily, Decimal::from(40));
    }

    #[test]
    fn only_owner_or_admin_manages_a_vehicle() {
        let owner = Uuid::new_v4();
        let v = vehicle(owner);
        let as_owner = AuthUser {
            user_id: owner,
            role: Role::Partner,
        };
        let as_other_partner = AuthUser {
            user_id: Uuid::new_v4(),
            role: Role::Partner,
        };
        let as_admin = AuthUser {
            user_id: Uuid::new_v4(),
            role: Role::Admin,
        };
        assert!(ensure_can_manage(&as_owner, &v).is_ok());
        assert!(ensure_can_manage(&as_admin, &v).is_ok());
        assert!(matches!(
            ensure_can_manage(&as_other_partner, &v),
            Err(AppError::Forbidden)
        ));
    }
}
