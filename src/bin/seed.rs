use fleet_booking_api::{
    config::AppConfig,
    db::{OrmConn, create_orm_conn, run_migrations},
    domain::{ListingState, Role},
    entity::{
        users::{ActiveModel as UserActive, Column as UserCol, Entity as Users},
        vehicles::{ActiveModel as VehicleActive, Column as VehicleCol, Entity as Vehicles},
    },
    services::auth_service::hash_password,
};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, EntityTrait, QueryFilter, Set};
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let orm = create_orm_conn(&config.database_url).await?;
    run_migrations(&orm).await?;

    let admin_id = ensure_user(&orm, "admin@example.com", "admin12345", Role::Admin).await?;
    let partner_id = ensure_user(&orm, "partner@example.com", "partner12345", Role::Partner).await?;
    let customer_id =
        ensure_user(&orm, "customer@example.com", "customer12345", Role::Customer).await?;
    seed_vehicles(&orm, partner_id).await?;

    println!(
        "Seed completed. Admin ID: {admin_id}, Partner ID: {partner_id}, Customer ID: {customer_id}"
    );
    Ok(())
}

async fn ensure_user(
    orm: &OrmConn,
    email: &str,
    password: &str,
    role: Role,
) -> anyhow::Result<Uuid> {
    if let Some(existing) = Users::find()
        .filter(UserCol::Email.eq(email))
        .one(orm)
        .await?
    {
        println!("User {email} already present");
        return Ok(existing.id);
    }

    let user = UserActive {
        id: Set(Uuid::new_v4()),
        email: Set(email.to_string()),
        password_hash: Set(hash_password(password)?),
        role: Set(role),
        created_at: NotSet,
    }
    .insert(orm)
    .await?;

    println!("Ensured user {email} (role={role})");
    Ok(user.id)
}

async fn seed_vehicles(orm: &OrmConn, owner_id: Uuid) -> anyhow::Result<()> {
    // brand, model, category, location, capacity, daily, weekly, monthly
    let fleet: [(&str, &str, &str, &str, i32, i64, Option<i64>, Option<i64>); 4] = [
        ("Toyota", "Yaris", "Economy", "Kyrenia", 3, 35, Some(210), Some(800)),
        ("Volkswagen", "Golf", "Compact", "Kyrenia", 2, 45, Some(280), None),
        ("Nissan", "Qashqai", "SUV", "Nicosia", 2, 60, None, None),
        ("Mercedes", "Vito", "Van", "Ercan Airport", 1, 95, Some(600), Some(2300)),
    ];

    for (brand, model, category, location, capacity, daily, weekly, monthly) in fleet {
        let exists = Vehicles::find()
            .filter(VehicleCol::OwnerId.eq(owner_id))
            .filter(VehicleCol::Brand.eq(brand))
            .filter(VehicleCol::VehicleModel.eq(model))
            .one(orm)
            .await?;
        if exists.is_some() {
            continue;
        }

        VehicleActive {
            id: Set(Uuid::new_v4()),
            owner_id: Set(owner_id),
            brand: Set(brand.to_string()),
            vehicle_model: Set(model.to_string()),
            year: Set(2023),
            category: Set(category.to_string()),
            location: Set(location.to_string()),
            capacity: Set(capacity),
            listing_state: Set(ListingState::Approved),
            active: Set(true),
            daily_rate: Set(Decimal::from(daily)),
            weekly_rate: Set(weekly.map(Decimal::from)),
            monthly_rate: Set(monthly.map(Decimal::from)),
            min_rental_days: Set(1),
            deleted_at: Set(None),
            created_at: NotSet,
            updated_at: NotSet,
        }
        .insert(orm)
        .await?;
    }

    println!("Seeded vehicles");
    Ok(())
}
