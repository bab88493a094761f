use std::{future::Future, time::Duration};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::models::Booking;

const DELIVERY_ATTEMPTS: u32 = 3;
const DELIVERY_BACKOFF: Duration = Duration::from_millis(200);

/// Payload handed to the notification side channel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BookingConfirmed {
    pub booking_id: Uuid,
    pub booking_number: String,
    pub customer_id: Uuid,
    pub vehicle_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub total_price: Decimal,
}

impl From<&Booking> for BookingConfirmed {
    fn from(booking: &Booking) -> Self {
        Self {
            booking_id: booking.id,
            booking_number: booking.booking_number.clone(),
            customer_id: booking.customer_id,
            vehicle_id: booking.vehicle_id,
            start_date: booking.start_date,
            end_date: booking.end_date,
            total_price: booking.total_price,
        }
    }
}

/// Where confirmations end up (mailer, queue, ...).
pub trait NotificationSink: Send + Sync + 'static {
    fn booking_confirmed(
        &self,
        event: &BookingConfirmed,
    ) -> impl Future<Output = anyhow::Result<()>> + Send;
}

/// Sink that only records the event in the log.
#[derive(Debug, Clone, Default)]
pub struct LogSink;

impl NotificationSink for LogSink {
    async fn booking_confirmed(&self, event: &BookingConfirmed) -> anyhow::Result<()> {
        tracing::info!(
            booking_id = %event.booking_id,
            booking_number = %event.booking_number,
            customer_id = %event.customer_id,
            "booking confirmation dispatched"
        );
        Ok(())
    }
}

/// Fire-and-forget handle. Sending never blocks and never fails the caller.
#[derive(Debug, Clone)]
pub struct Notifier {
    tx: Option<mpsc::UnboundedSender<BookingConfirmed>>,
}

impl Notifier {
    /// Spawns a delivery worker on the current runtime.
    pub fn spawn<S: NotificationSink>(sink: S) -> Self {
        let (notifier, mut rx) = Self::channel();
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                deliver(&sink, &event).await;
            }
            tracing::debug!("notification worker stopped");
        });
        notifier
    }

    /// Notifier plus the receiving end, for callers that drive delivery
    /// themselves.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<BookingConfirmed>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    pub fn disabled() -> Self {
        Self { tx: None }
    }

    pub fn notify_booking_confirmed(&self, booking: &Booking) {
        let Some(tx) = &self.tx else {
            return;
        };
        if let Err(err) = tx.send(BookingConfirmed::from(booking)) {
            tracing::warn!(
                booking_id = %booking.id,
                error = %err,
                "notification channel closed, confirmation dropped"
            );
        }
    }
}

async fn deliver<S: NotificationSink>(sink: &S, event: &BookingConfirmed) {
    for attempt in 1..=DELIVERY_ATTEMPTS {
        match sink.booking_confirmed(event).await {
            Ok(()) => return,
            Err(err) if attempt < DELIVERY_ATTEMPTS => {
                tracing::warn!(
                    booking_id = %event.booking_id,
                    attempt,
                    error = %err,
                    "confirmation delivery failed, retrying"
                );
                tokio::time::sleep(DELIVERY_BACKOFF * attempt).await;
            }
            Err(err) => {
                tracing::error!(
                    booking_id = %event.booking_id,
                    error = %err,
                    "confirmation delivery failed"
                );
            }
        }
    }
}
