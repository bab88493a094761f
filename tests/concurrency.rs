mod common;

use std::time::Duration;

use common::{
    VehicleSpec, booking_request, create_user, create_vehicle, database_url, day, setup_state,
    setup_state_with,
};
use fleet_booking_api::{
    config::BookingSettings,
    domain::{DateRange, Role},
    dto::bookings::CreateBookingRequest,
    error::AppError,
    middleware::auth::AuthUser,
    notify::Notifier,
    services::{availability_service, booking_service, inventory_service},
    state::AppState,
};
use sea_orm::TransactionTrait;
use tokio::task::JoinSet;

const CONTENDERS: usize = 12;
const ROUNDS: i64 = 5;

#[derive(Debug, Default, PartialEq, Eq)]
struct Tally {
    admitted: usize,
    rejected: usize,
}

/// Fires every request at once and sorts the outcomes. Anything other than
/// admission or `CapacityExceeded` fails the test.
async fn race(state: &AppState, requests: Vec<(AuthUser, CreateBookingRequest)>) -> Tally {
    let mut set = JoinSet::new();
    for (user, request) in requests {
        let state = state.clone();
        set.spawn(async move { booking_service::create_booking(&state, &user, request).await });
    }

    let mut tally = Tally::default();
    while let Some(joined) = set.join_next().await {
        match joined.expect("task panicked") {
            Ok(_) => tally.admitted += 1,
            Err(AppError::CapacityExceeded(_)) => tally.rejected += 1,
            Err(other) => panic!("unexpected admission error: {other:?}"),
        }
    }
    tally
}

async fn customers(state: &AppState, n: usize) -> anyhow::Result<Vec<AuthUser>> {
    let mut users = Vec::with_capacity(n);
    for _ in 0..n {
        users.push(create_user(state, Role::Customer).await?);
    }
    Ok(users)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn single_unit_admits_exactly_one_of_many() -> anyhow::Result<()> {
    let Some(url) = database_url() else {
        return Ok(());
    };
    let state = setup_state(&url, Notifier::disabled()).await?;
    let partner = create_user(&state, Role::Partner).await?;
    let vehicle_id = create_vehicle(&state, &partner, VehicleSpec::default()).await?;
    let users = customers(&state, CONTENDERS).await?;

    for round in 0..ROUNDS {
        let start = 10 + round * 10;
        let requests = users
            .iter()
            .enumerate()
            .map(|(i, user)| {
                // staggered ranges that all cover day `start + 2`
                let offset = (i % 3) as i64;
                (user.clone(), booking_request(vehicle_id, start + offset, start + 3 + offset))
            })
            .collect();

        let tally = race(&state, requests).await;
        assert_eq!(
            tally,
            Tally {
                admitted: 1,
                rejected: CONTENDERS - 1
            },
            "round {round}"
        );

        let window = DateRange::new(day(start), day(start + 6))?;
        assert_eq!(
            availability_service::count_overlapping(&state.orm, vehicle_id, &window).await?,
            1
        );
    }
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn capacity_three_admits_exactly_three() -> anyhow::Result<()> {
    let Some(url) = database_url() else {
        return Ok(());
    };
    let state = setup_state(&url, Notifier::disabled()).await?;
    let partner = create_user(&state, Role::Partner).await?;
    let vehicle_id = create_vehicle(
        &state,
        &partner,
        VehicleSpec {
            capacity: 3,
            ..VehicleSpec::default()
        },
    )
    .await?;
    let users = customers(&state, CONTENDERS).await?;

    for round in 0..ROUNDS {
        let start = 100 + round * 10;
        let requests = users
            .iter()
            .map(|user| (user.clone(), booking_request(vehicle_id, start, start + 4)))
            .collect();

        let tally = race(&state, requests).await;
        assert_eq!(tally.admitted, 3, "round {round}");
        assert_eq!(tally.rejected, CONTENDERS - 3, "round {round}");
    }
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn disjoint_ranges_never_conflict() -> anyhow::Result<()> {
    let Some(url) = database_url() else {
        return Ok(());
    };
    let state = setup_state(&url, Notifier::disabled()).await?;
    let partner = create_user(&state, Role::Partner).await?;
    let vehicle_id = create_vehicle(&state, &partner, VehicleSpec::default()).await?;
    let users = customers(&state, 8).await?;

    // back-to-back two-day slots
    let requests = users
        .iter()
        .enumerate()
        .map(|(i, user)| {
            let start = 200 + 2 * i as i64;
            (user.clone(), booking_request(vehicle_id, start, start + 2))
        })
        .collect();

    let tally = race(&state, requests).await;
    assert_eq!(
        tally,
        Tally {
            admitted: 8,
            rejected: 0
        }
    );
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn separate_vehicles_do_not_contend() -> anyhow::Result<()> {
    let Some(url) = database_url() else {
        return Ok(());
    };
    let state = setup_state(&url, Notifier::disabled()).await?;
    let partner = create_user(&state, Role::Partner).await?;
    let users = customers(&state, 4).await?;

    let mut requests = Vec::new();
    let mut vehicles = Vec::new();
    for _ in 0..4 {
        let vehicle_id = create_vehicle(&state, &partner, VehicleSpec::default()).await?;
        vehicles.push(vehicle_id);
        for user in &users {
            requests.push((user.clone(), booking_request(vehicle_id, 300, 305)));
        }
    }

    let tally = race(&state, requests).await;
    assert_eq!(tally.admitted, vehicles.len());
    assert_eq!(tally.rejected, vehicles.len() * (users.len() - 1));
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn held_vehicle_lock_surfaces_as_temporarily_unavailable() -> anyhow::Result<()> {
    let Some(url) = database_url() else {
        return Ok(());
    };
    let settings = BookingSettings {
        max_attempts: 2,
        retry_base_delay: Duration::from_millis(5),
        lock_timeout: Duration::from_millis(100),
    };
    let state = setup_state_with(&url, Notifier::disabled(), settings).await?;
    let partner = create_user(&state, Role::Partner).await?;
    let customer = create_user(&state, Role::Customer).await?;
    let vehicle_id = create_vehicle(&state, &partner, VehicleSpec::default()).await?;

    let holder = state.orm.begin().await?;
    inventory_service::lock_vehicle(&holder, vehicle_id).await?;

    let request = booking_request(vehicle_id, 10, 12);
    let err = booking_service::create_booking(&state, &customer, request)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::TemporarilyUnavailable), "{err:?}");
    assert_eq!(err.code(), "temporarily_unavailable");

    let err = inventory_service::update_capacity(&state, &partner, vehicle_id, 2)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::TemporarilyUnavailable), "{err:?}");
    let err = inventory_service::delete_vehicle(&state, &partner, vehicle_id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::TemporarilyUnavailable), "{err:?}");

    holder.rollback().await?;

    // nothing from the timed out attempts was kept
    let window = DateRange::new(day(10), day(12))?;
    assert_eq!(
        availability_service::count_overlapping(&state.orm, vehicle_id, &window).await?,
        0
    );
    let vehicle = inventory_service::get_vehicle(&state, vehicle_id).await?;
    assert_eq!(vehicle.into_data().map(|v| v.capacity), Some(1));

    booking_service::create_booking(&state, &customer, booking_request(vehicle_id, 10, 12)).await?;
    Ok(())
}
