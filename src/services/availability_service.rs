use sea_orm::{ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter};
use uuid::Uuid;

use crate::{
    domain::{BookingStatus, DateRange},
    dto::bookings::AvailabilityQuery,
    entity::bookings::{Column as BookingCol, Entity as Bookings},
    error::AppResult,
    models::Availability,
    response::ApiResponse,
    services::inventory_service::{capacity_of, find_vehicle, is_bookable},
    state::AppState,
};

/// Active bookings on `vehicle_id` whose range intersects `range`.
///
/// Two half-open ranges intersect iff `a.start < b.end && a.end > b.start`,
/// so a booking that returns on the day another starts is not counted.
pub async fn count_overlapping<C: ConnectionTrait>(
    conn: &C,
    vehicle_id: Uuid,
    range: &DateRange,
) -> AppResult<i64> {
    let count = Bookings::find()
        .filter(
            Condition::all()
                .add(BookingCol::VehicleId.eq(vehicle_id))
                .add(BookingCol::Status.is_in(BookingStatus::ACTIVE))
                .add(BookingCol::StartDate.lt(range.end()))
                .add(BookingCol::EndDate.gt(range.start())),
        )
        .count(conn)
        .await?;
    Ok(count as i64)
}

/// Availability against the current snapshot. Informational only: the answer
/// can be stale by the time a booking is attempted.
pub async fn availability_for<C: ConnectionTrait>(
    conn: &C,
    vehicle_id: Uuid,
    range: &DateRange,
) -> AppResult<Availability> {
    let vehicle = find_vehicle(conn, vehicle_id).await?;
    if !is_bookable(&vehicle) {
        return Ok(Availability::unavailable());
    }
    let overlapping = count_overlapping(conn, vehicle_id, range).await?;
    Ok(Availability::from_overlaps(capacity_of(&vehicle), overlapping))
}

pub async fn check_availability(
    state: &AppState,
    query: AvailabilityQuery,
) -> AppResult<ApiResponse<Availability>> {
    let range = DateRange::new(query.start_date, query.end_date)?;
    let availability = availability_for(&state.orm, query.vehicle_id, &range).await?;
    Ok(ApiResponse::success("Availability", availability, None))
}
