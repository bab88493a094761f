use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    domain::{BookingStatus, PaymentStatus},
    models::Booking,
};

/// How the customer pays, which decides the initial status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PaymentFlow {
    /// Pay at pickup: the booking starts as `pending`.
    #[default]
    PayAtPickup,
    /// Card checkout: the booking starts as `pending_payment`.
    PayOnline,
}

impl PaymentFlow {
    pub fn initial_status(self) -> BookingStatus {
        match self {
            PaymentFlow::PayAtPickup => BookingStatus::Pending,
            PaymentFlow::PayOnline => BookingStatus::PendingPayment,
        }
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateBookingRequest {
    pub vehicle_id: Uuid,
    pub start_date: NaiveDate,
    /// Exclusive return date.
    pub end_date: NaiveDate,
    pub pickup_location: String,
    pub dropoff_location: String,
    #[serde(default)]
    pub payment_flow: PaymentFlow,
    /// Book on behalf of this user. Admins and the vehicle's owner only;
    /// defaults to the caller.
    #[serde(default)]
    pub customer_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct TransitionRequest {
    pub status: BookingStatus,
}

/// Outcome reported by the payment collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PaymentOutcome {
    Paid,
    Failed,
    Refunded,
}

impl PaymentOutcome {
    pub fn target(self) -> PaymentStatus {
        match self {
            PaymentOutcome::Paid => PaymentStatus::Paid,
            PaymentOutcome::Failed => PaymentStatus::Failed,
            PaymentOutcome::Refunded => PaymentStatus::Refunded,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RecordPaymentRequest {
    pub outcome: PaymentOutcome,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AvailabilityQuery {
    pub vehicle_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BookingList {
    pub items: Vec<Booking>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payment_flow_picks_initial_status() {
        assert_eq!(PaymentFlow::PayAtPickup.initial_status(), BookingStatus::Pending);
        assert_eq!(
            PaymentFlow::PayOnline.initial_status(),
            BookingStatus::PendingPayment
        );
    }

    #[test]
    fn create_request_defaults_to_pay_at_pickup() {
        let req: CreateBookingRequest = serde_json::from_value(serde_json::json!({
            "vehicle_id": Uuid::nil(),
            "start_date": "2025-06-01",
            "end_date": "2025-06-05",
            "pickup_location": "Kyrenia",
            "dropoff_location": "Ercan Airport"
        }))
        .unwrap();
        assert_eq!(req.payment_flow, PaymentFlow::PayAtPickup);
        assert_eq!(req.customer_id, None);
        assert_eq!(req.start_date, NaiveDate::from_ymd_opt(2025, 6, 1).unwrap());
    }
}
