use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::{BookingStatus, ListingState, PaymentStatus, Role};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Vehicle {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub brand: String,
    pub vehicle_model: String,
    pub year: i32,
    pub category: String,
    pub location: String,
    pub capacity: i32,
    pub listing_state: ListingState,
    pub active: bool,
    pub daily_rate: Decimal,
    pub weekly_rate: Option<Decimal>,
    pub monthly_rate: Option<Decimal>,
    pub min_rental_days: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Booking {
    pub id: Uuid,
    pub booking_number: String,
    pub vehicle_id: Uuid,
    pub customer_id: Uuid,
    pub start_date: NaiveDate,
    /// Exclusive: the vehicle is free again on this day.
    pub end_date: NaiveDate,
    pub status: BookingStatus,
    pub payment_status: PaymentStatus,
    pub total_price: Decimal,
    pub pickup_location: String,
    pub dropoff_location: String,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Answer of the conflict detector for one vehicle and date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Availability {
    pub available: bool,
    pub remaining: i64,
}

impl Availability {
    pub fn unavailable() -> Self {
        Self {
            available: false,
            remaining: 0,
        }
    }

    pub fn from_overlaps(capacity: i32, overlapping: i64) -> Self {
        let remaining = (i64::from(capacity) - overlapping).max(0);
        Self {
            available: remaining > 0,
            remaining,
        }
    }
}
