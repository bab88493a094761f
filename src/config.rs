use std::{env, str::FromStr, time::Duration};

use crate::retry::RetryPolicy;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub booking: BookingSettings,
}

/// Tuning for the booking transaction manager.
#[derive(Debug, Clone, Copy)]
pub struct BookingSettings {
    /// Attempts for an admission or transition that hits storage contention.
    pub max_attempts: u32,
    pub retry_base_delay: Duration,
    /// Upper bound on waiting for a vehicle or booking row lock.
    pub lock_timeout: Duration,
}

impl Default for BookingSettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            retry_base_delay: Duration::from_millis(25),
            lock_timeout: Duration::from_millis(5000),
        }
    }
}

impl BookingSettings {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_attempts: env_or("BOOKING_MAX_ATTEMPTS", defaults.max_attempts).max(1),
            retry_base_delay: Duration::from_millis(env_or(
                "BOOKING_RETRY_BASE_MS",
                defaults.retry_base_delay.as_millis() as u64,
            )),
            // 0 would mean "wait forever" to Postgres
            lock_timeout: Duration::from_millis(
                env_or(
                    "BOOKING_LOCK_TIMEOUT_MS",
                    defaults.lock_timeout.as_millis() as u64,
                )
                .max(1),
            ),
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            base_delay: self.retry_base_delay,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL")?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env_or("APP_PORT", 3000);
        Ok(Self {
            port,
            database_url,
            host,
            booking: BookingSettings::from_env(),
        })
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}
