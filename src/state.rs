use crate::{config::BookingSettings, db::OrmConn, notify::Notifier};

#[derive(Clone)]
pub struct AppState {
    pub orm: OrmConn,
    pub notifier: Notifier,
    pub booking: BookingSettings,
}

impl AppState {
    pub fn new(orm: OrmConn, notifier: Notifier, booking: BookingSettings) -> Self {
        Self {
            orm,
            notifier,
            booking,
        }
    }
}
