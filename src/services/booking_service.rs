use std::time::Duration;

use chrono::Utc;
use sea_orm::sea_query::{LockType, Query};
use sea_orm::ActiveValue::NotSet;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseTransaction, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit,
    db::{OrmConn, set_lock_timeout},
    domain::{BookingStatus, DateRange, PaymentStatus, Role, booking_number},
    dto::bookings::{BookingList, CreateBookingRequest, PaymentOutcome},
    entity::{
        bookings::{
            ActiveModel as BookingActive, Column as BookingCol, Entity as Bookings,
            Model as BookingModel,
        },
        users::Entity as Users,
        vehicles::{Column as VehicleCol, Entity as Vehicles},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::{Availability, Booking},
    response::{ApiResponse, Meta},
    routes::params::{BookingListQuery, SortOrder},
    services::{
        availability_service::count_overlapping,
        inventory_service::{capacity_of, is_bookable, lock_vehicle, rate_table},
    },
    state::AppState,
};

const BOOKING_NUMBER_KEY: &str = "bookings_booking_number_key";

/// Validated input for one admission attempt.
#[derive(Debug, Clone)]
struct NewBooking {
    vehicle_id: Uuid,
    customer_id: Uuid,
    booked_by: AuthUser,
    range: DateRange,
    status: BookingStatus,
    pickup_location: String,
    dropoff_location: String,
}

pub async fn create_booking(
    state: &AppState,
    user: &AuthUser,
    payload: CreateBookingRequest,
) -> AppResult<ApiResponse<Booking>> {
    create_booking_with_numbers(state, user, payload, booking_number::generate).await
}

/// [`create_booking`] drawing booking numbers from `next_number`, one per
/// admission attempt.
pub async fn create_booking_with_numbers<N>(
    state: &AppState,
    user: &AuthUser,
    payload: CreateBookingRequest,
    mut next_number: N,
) -> AppResult<ApiResponse<Booking>>
where
    N: FnMut() -> String,
{
    let range = DateRange::new(payload.start_date, payload.end_date)?;
    range.ensure_not_past(Utc::now().date_naive())?;

    let pickup_location = payload.pickup_location.trim().to_string();
    let dropoff_location = payload.dropoff_location.trim().to_string();
    if pickup_location.is_empty() || dropoff_location.is_empty() {
        return Err(AppError::BadRequest(
            "pickup_location and dropoff_location are required".into(),
        ));
    }

    let customer_id = match payload.customer_id {
        Some(id) if id != user.user_id => {
            if user.role == Role::Customer {
                return Err(AppError::Forbidden);
            }
            ensure_user_exists(&state.orm, id).await?;
            id
        }
        _ => user.user_id,
    };

    let request = NewBooking {
        vehicle_id: payload.vehicle_id,
        customer_id,
        booked_by: user.clone(),
        range,
        status: payload.payment_flow.initial_status(),
        pickup_location,
        dropoff_location,
    };

    let orm = &state.orm;
    let lock_timeout = state.booking.lock_timeout;
    let request = &request;
    let booking = state
        .booking
        .retry_policy()
        .run(
            "create_booking",
            |err: &AppError| err.is_transient() || err.is_unique_violation_on(BOOKING_NUMBER_KEY),
            move |_| admit_booking(orm, lock_timeout, request, next_number()),
        )
        .await?;

    tracing::info!(
        booking_id = %booking.id,
        booking_number = %booking.booking_number,
        vehicle_id = %booking.vehicle_id,
        customer_id = %booking.customer_id,
        "booking admitted"
    );
    audit::record(
        &state.orm,
        user.user_id,
        "booking_create",
        "bookings",
        serde_json::json!({
            "booking_id": booking.id,
            "vehicle_id": booking.vehicle_id,
            "customer_id": booking.customer_id,
        }),
    )
    .await;

    Ok(ApiResponse::success(
        "Booking created",
        booking_from_entity(booking),
        Some(Meta::empty()),
    ))
}

async fn ensure_user_exists(orm: &OrmConn, id: Uuid) -> AppResult<()> {
    match Users::find_by_id(id).one(orm).await? {
        Some(_) => Ok(()),
        None => Err(AppError::BadRequest(format!("customer {id} does not exist"))),
    }
}

/// Booking for someone else is limited to admins and the vehicle's owner.
fn authorize_booking_for(user: &AuthUser, customer_id: Uuid, owner_id: Uuid) -> AppResult<()> {
    let allowed = customer_id == user.user_id
        || user.role == Role::Admin
        || (user.role == Role::Partner && user.user_id == owner_id);
    if allowed {
        Ok(())
    } else {
        Err(AppError::Forbidden)
    }
}

/// One admission attempt. The vehicle row lock makes the count and the insert
/// a single step for that vehicle; an early return drops `txn`, which rolls
/// back.
async fn admit_booking(
    orm: &OrmConn,
    lock_timeout: Duration,
    request: &NewBooking,
    booking_number: String,
) -> AppResult<BookingModel> {
    let txn = orm.begin().await?;
    set_lock_timeout(&txn, lock_timeout).await?;

    let vehicle = lock_vehicle(&txn, request.vehicle_id).await?;
    authorize_booking_for(&request.booked_by, request.customer_id, vehicle.owner_id)?;
    if !is_bookable(&vehicle) {
        return Err(AppError::VehicleNotBookable(vehicle.id));
    }
    if request.range.days() < i64::from(vehicle.min_rental_days) {
        return Err(AppError::BadRequest(format!(
            "minimum rental is {} days",
            vehicle.min_rental_days
        )));
    }
    let total_price = rate_table(&vehicle).storable_quote(&request.range)?;

    let overlapping = count_overlapping(&txn, vehicle.id, &request.range).await?;
    if !Availability::from_overlaps(capacity_of(&vehicle), overlapping).available {
        return Err(AppError::CapacityExceeded(vehicle.id));
    }

    let booking = BookingActive {
        id: Set(Uuid::new_v4()),
        booking_number: Set(booking_number),
        vehicle_id: Set(vehicle.id),
        customer_id: Set(request.customer_id),
        start_date: Set(request.range.start()),
        end_date: Set(request.range.end()),
        status: Set(request.status),
        payment_status: Set(PaymentStatus::Pending),
        total_price: Set(total_price),
        pickup_location: Set(request.pickup_location.clone()),
        dropoff_location: Set(request.dropoff_location.clone()),
        confirmed_at: Set(None),
        cancelled_at: Set(None),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;
    Ok(booking)
}

async fn lock_booking(txn: &DatabaseTransaction, id: Uuid) -> AppResult<BookingModel> {
    Bookings::find_by_id(id)
        .lock(LockType::Update)
        .one(txn)
        .await?
        .ok_or(AppError::BookingNotFound(id))
}

/// Owner of the booked vehicle. Soft-deleted vehicles still have an owner.
async fn vehicle_owner<C: ConnectionTrait>(conn: &C, vehicle_id: Uuid) -> AppResult<Uuid> {
    Vehicles::find_by_id(vehicle_id)
        .one(conn)
        .await?
        .map(|v| v.owner_id)
        .ok_or(AppError::VehicleNotFound(vehicle_id))
}

/// Operational moves belong to the admin or the vehicle's owner; the customer
/// may additionally cancel their own booking.
fn authorize_transition(
    user: &AuthUser,
    customer_id: Uuid,
    owner_id: Uuid,
    target: BookingStatus,
) -> AppResult<()> {
    let allowed = match user.role {
        Role::Admin => true,
        Role::Partner if user.user_id == owner_id => true,
        _ => target == BookingStatus::Cancelled && user.user_id == customer_id,
    };
    if allowed {
        Ok(())
    } else {
        Err(AppError::Forbidden)
    }
}

/// `Ok(false)` means nothing to write: cancelling a cancelled booking.
fn plan_transition(from: BookingStatus, to: BookingStatus) -> AppResult<bool> {
    if from == BookingStatus::Cancelled && to == BookingStatus::Cancelled {
        return Ok(false);
    }
    if !from.can_transition_to(to) {
        return Err(AppError::invalid_transition(from, to));
    }
    Ok(true)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PaymentPlan {
    Unchanged,
    Apply { confirm: bool },
}

fn plan_payment(
    status: BookingStatus,
    current: PaymentStatus,
    target: PaymentStatus,
) -> AppResult<PaymentPlan> {
    if current == target {
        return Ok(PaymentPlan::Unchanged);
    }
    if status == BookingStatus::Cancelled && target != PaymentStatus::Refunded {
        return Err(AppError::invalid_transition(status, target));
    }
    if !current.can_transition_to(target) {
        return Err(AppError::invalid_transition(current, target));
    }
    let confirm = target == PaymentStatus::Paid
        && matches!(status, BookingStatus::Pending | BookingStatus::PendingPayment);
    Ok(PaymentPlan::Apply { confirm })
}

/// Returns the stored booking and whether this call moved it into
/// `confirmed`.
async fn apply_transition(
    orm: &OrmConn,
    lock_timeout: Duration,
    user: &AuthUser,
    id: Uuid,
    target: BookingStatus,
) -> AppResult<(BookingModel, bool)> {
    let txn = orm.begin().await?;
    set_lock_timeout(&txn, lock_timeout).await?;

    let booking = lock_booking(&txn, id).await?;
    let owner_id = vehicle_owner(&txn, booking.vehicle_id).await?;
    authorize_transition(user, booking.customer_id, owner_id, target)?;

    if !plan_transition(booking.status, target)? {
        txn.commit().await?;
        return Ok((booking, false));
    }

    let now = Utc::now();
    let mut active: BookingActive = booking.into();
    active.status = Set(target);
    match target {
        BookingStatus::Confirmed => active.confirmed_at = Set(Some(now.into())),
        BookingStatus::Cancelled => active.cancelled_at = Set(Some(now.into())),
        _ => {}
    }
    active.updated_at = Set(now.into());
    let booking = active.update(&txn).await?;

    txn.commit().await?;
    Ok((booking, target == BookingStatus::Confirmed))
}

pub async fn transition_booking(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    target: BookingStatus,
) -> AppResult<ApiResponse<Booking>> {
    let orm = &state.orm;
    let lock_timeout = state.booking.lock_timeout;
    let (booking, confirmed) = state
        .booking
        .retry_policy()
        .run("transition_booking", AppError::is_transient, move |_| {
            apply_transition(orm, lock_timeout, user, id, target)
        })
        .await?;

    let booking = booking_from_entity(booking);
    if confirmed {
        state.notifier.notify_booking_confirmed(&booking);
    }

    tracing::info!(booking_id = %booking.id, status = %booking.status, "booking transitioned");
    audit::record(
        &state.orm,
        user.user_id,
        "booking_transition",
        "bookings",
        serde_json::json!({ "booking_id": booking.id, "status": booking.status.as_str() }),
    )
    .await;

    Ok(ApiResponse::success(
        "Booking updated",
        booking,
        Some(Meta::empty()),
    ))
}

/// Idempotent: cancelling an already cancelled booking succeeds unchanged.
pub async fn cancel_booking(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Booking>> {
    transition_booking(state, user, id, BookingStatus::Cancelled).await
}

async fn apply_payment(
    orm: &OrmConn,
    lock_timeout: Duration,
    id: Uuid,
    outcome: PaymentOutcome,
) -> AppResult<(BookingModel, bool)> {
    let txn = orm.begin().await?;
    set_lock_timeout(&txn, lock_timeout).await?;

    let booking = lock_booking(&txn, id).await?;
    let target = outcome.target();
    let confirm = match plan_payment(booking.status, booking.payment_status, target)? {
        PaymentPlan::Unchanged => {
            txn.commit().await?;
            return Ok((booking, false));
        }
        PaymentPlan::Apply { confirm } => confirm,
    };

    let now = Utc::now();
    let mut active: BookingActive = booking.into();
    active.payment_status = Set(target);
    if confirm {
        active.status = Set(BookingStatus::Confirmed);
        active.confirmed_at = Set(Some(now.into()));
    }
    active.updated_at = Set(now.into());
    let booking = active.update(&txn).await?;

    txn.commit().await?;
    Ok((booking, confirm))
}

/// Payment collaborator callback. A successful payment also confirms a
/// booking that is still waiting for it.
pub async fn record_payment(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    outcome: PaymentOutcome,
) -> AppResult<ApiResponse<Booking>> {
    ensure_admin(user)?;

    let orm = &state.orm;
    let lock_timeout = state.booking.lock_timeout;
    let (booking, confirmed) = state
        .booking
        .retry_policy()
        .run("record_payment", AppError::is_transient, move |_| {
            apply_payment(orm, lock_timeout, id, outcome)
        })
        .await?;

    let booking = booking_from_entity(booking);
    if confirmed {
        state.notifier.notify_booking_confirmed(&booking);
    }

    tracing::info!(
        booking_id = %booking.id,
        payment_status = %booking.payment_status,
        "payment recorded"
    );
    audit::record(
        &state.orm,
        user.user_id,
        "booking_payment",
        "bookings",
        serde_json::json!({
            "booking_id": booking.id,
            "payment_status": booking.payment_status.as_str(),
        }),
    )
    .await;

    Ok(ApiResponse::success(
        "Payment recorded",
        booking,
        Some(Meta::empty()),
    ))
}

/// Bookings outside the caller's reach read as missing.
pub async fn get_booking(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Booking>> {
    let booking = Bookings::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::BookingNotFound(id))?;

    let visible = match user.role {
        Role::Admin => true,
        _ if booking.customer_id == user.user_id => true,
        Role::Partner => vehicle_owner(&state.orm, booking.vehicle_id).await? == user.user_id,
        Role::Customer => false,
    };
    if !visible {
        return Err(AppError::BookingNotFound(id));
    }

    Ok(ApiResponse::success(
        "Booking",
        booking_from_entity(booking),
        Some(Meta::empty()),
    ))
}

/// Customers see their own bookings; partners see bookings on their vehicles.
pub async fn list_my_bookings(
    state: &AppState,
    user: &AuthUser,
    query: BookingListQuery,
) -> AppResult<ApiResponse<BookingList>> {
    let scope = match user.role {
        Role::Partner => Condition::all().add(
            BookingCol::VehicleId.in_subquery(
                Query::select()
                    .column(VehicleCol::Id)
                    .from(Vehicles)
                    .and_where(VehicleCol::OwnerId.eq(user.user_id))
                    .to_owned(),
            ),
        ),
        Role::Customer | Role::Admin => {
            Condition::all().add(BookingCol::CustomerId.eq(user.user_id))
        }
    };
    list_bookings(state, scope, query).await
}

pub async fn list_all_bookings(
    state: &AppState,
    user: &AuthUser,
    query: BookingListQuery,
) -> AppResult<ApiResponse<BookingList>> {
    ensure_admin(user)?;
    list_bookings(state, Condition::all(), query).await
}

async fn list_bookings(
    state: &AppState,
    mut condition: Condition,
    query: BookingListQuery,
) -> AppResult<ApiResponse<BookingList>> {
    let (page, limit, offset) = query.pagination().normalize();
    if let Some(status) = query.status {
        condition = condition.add(BookingCol::Status.eq(status));
    }
    if let Some(vehicle_id) = query.vehicle_id {
        condition = condition.add(BookingCol::VehicleId.eq(vehicle_id));
    }

    let mut finder = Bookings::find().filter(condition);
    finder = match query.sort_order.unwrap_or(SortOrder::Desc) {
        SortOrder::Asc => finder.order_by_asc(BookingCol::CreatedAt),
        SortOrder::Desc => finder.order_by_desc(BookingCol::CreatedAt),
    };

    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(booking_from_entity)
        .collect();

    Ok(ApiResponse::page(
        "Bookings",
        BookingList { items },
        Meta::new(page, limit, total),
    ))
}

pub(crate) fn booking_from_entity(model: BookingModel) -> Booking {
    Booking {
        id: model.id,
        booking_number: model.booking_number,
        vehicle_id: model.vehicle_id,
        customer_id: model.customer_id,
        start_date: model.start_date,
        end_date: model.end_date,
        status: model.status,
        payment_status: model.payment_status,
        total_price: model.total_price,
        pickup_location: model.pickup_location,
        dropoff_location: model.dropoff_location,
        confirmed_at: model.confirmed_at.map(|dt| dt.with_timezone(&Utc)),
        cancelled_at: model.cancelled_at.map(|dt| dt.with_timezone(&Utc)),
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}
