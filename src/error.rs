use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use sea_orm::{DbErr, RuntimeErr};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::response::{ApiResponse, Meta};

/// SQLSTATEs that mean "try again": serialization_failure, deadlock_detected,
/// lock_not_available.
const TRANSIENT_SQLSTATES: [&str; 3] = ["40001", "40P01", "55P03"];

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Vehicle {0} not found")]
    VehicleNotFound(Uuid),

    #[error("Booking {0} not found")]
    BookingNotFound(Uuid),

    #[error("Bad Request {0}")]
    BadRequest(String),

    #[error("Invalid interval: {0}")]
    InvalidInterval(String),

    #[error("Forbidden")]
    Forbidden,

    #[error("Vehicle {0} is not open for booking")]
    VehicleNotBookable(Uuid),

    #[error("Vehicle {0} is no longer available for the requested dates")]
    CapacityExceeded(Uuid),

    #[error("Cannot move from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Temporarily unavailable, please retry")]
    TemporarilyUnavailable,

    #[error("Database error")]
    DbError(#[from] sqlx::Error),

    #[error("ORM error")]
    OrmError(#[from] DbErr),

    #[error("Internal Server Error")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn invalid_transition(from: impl ToString, to: impl ToString) -> Self {
        AppError::InvalidTransition {
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    /// Stable machine-readable code so clients can tell "pick other dates"
    /// apart from "fix your input".
    pub fn code(&self) -> &'static str {
        match self {
            AppError::VehicleNotFound(_) => "vehicle_not_found",
            AppError::BookingNotFound(_) => "booking_not_found",
            AppError::BadRequest(_) => "validation_error",
            AppError::InvalidInterval(_) => "invalid_interval",
            AppError::Forbidden => "forbidden",
            AppError::VehicleNotBookable(_) => "vehicle_not_bookable",
            AppError::CapacityExceeded(_) => "capacity_exceeded",
            AppError::InvalidTransition { .. } => "invalid_transition",
            AppError::TemporarilyUnavailable => "temporarily_unavailable",
            AppError::DbError(_) | AppError::OrmError(_) | AppError::Internal(_) => "internal",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::VehicleNotFound(_) | AppError::BookingNotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) | AppError::InvalidInterval(_) => StatusCode::BAD_REQUEST,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::VehicleNotBookable(_)
            | AppError::CapacityExceeded(_)
            | AppError::InvalidTransition { .. } => StatusCode::CONFLICT,
            AppError::TemporarilyUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            AppError::DbError(_) | AppError::OrmError(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Storage contention that is safe to retry with the same input.
    pub fn is_transient(&self) -> bool {
        self.sqlstate()
            .is_some_and(|code| is_transient_sqlstate(&code))
    }

    /// Unique violation (23505) on the named constraint.
    pub fn is_unique_violation_on(&self, constraint: &str) -> bool {
        self.database_error().is_some_and(|db| {
            db.code().as_deref() == Some("23505") && db.constraint() == Some(constraint)
        })
    }

    fn sqlstate(&self) -> Option<String> {
        self.database_error()
            .and_then(|db| db.code().map(|code| code.into_owned()))
    }

    fn database_error(&self) -> Option<&dyn sqlx::error::DatabaseError> {
        let err: &sqlx::Error = match self {
            AppError::DbError(e) => e,
            AppError::OrmError(DbErr::Exec(RuntimeErr::SqlxError(e)))
            | AppError::OrmError(DbErr::Query(RuntimeErr::SqlxError(e)))
            | AppError::OrmError(DbErr::Conn(RuntimeErr::SqlxError(e))) => e,
            _ => return None,
        };
        match err {
            sqlx::Error::Database(db) => Some(db.as_ref()),
            _ => None,
        }
    }
}

pub fn is_transient_sqlstate(code: &str) -> bool {
    TRANSIENT_SQLSTATES.contains(&code)
}

#[derive(Serialize)]
struct ErrorData {
    error: String,
    code: &'static str,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = ?self, "request failed");
        }

        let body = ApiResponse {
            message: self.to_string(),
            data: Some(ErrorData {
                error: self.to_string(),
                code: self.code(),
            }),
            meta: Some(Meta::empty()),
        };

        (status, axum::Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capacity_and_validation_errors_are_distinguishable() {
        let capacity = AppError::CapacityExceeded(Uuid::nil());
        let interval = AppError::InvalidInterval("start after end".into());
        assert_eq!(capacity.status(), StatusCode::CONFLICT);
        assert_eq!(interval.status(), StatusCode::BAD_REQUEST);
        assert_ne!(capacity.code(), interval.code());
    }

    #[test]
    fn contention_maps_to_service_unavailable() {
        assert_eq!(
            AppError::TemporarilyUnavailable.status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn classifies_postgres_contention_codes() {
        assert!(is_transient_sqlstate("40001"));
        assert!(is_transient_sqlstate("40P01"));
        assert!(is_transient_sqlstate("55P03"));
        assert!(!is_transient_sqlstate("23505"));
        assert!(!is_transient_sqlstate("23514"));
    }

    #[test]
    fn domain_errors_are_never_transient() {
        assert!(!AppError::CapacityExceeded(Uuid::nil()).is_transient());
        assert!(!AppError::Forbidden.is_transient());
        assert!(!AppError::OrmError(DbErr::RecordNotFound("x".into())).is_transient());
    }
}
