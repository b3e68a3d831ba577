//! Scheduler errors
//!
//! Every variant is recoverable by the caller. Conversion into [`AppError`]
//! picks the error code and therefore the HTTP status.

use thiserror::Error;

use crate::db::repository::RepoError;
use crate::utils::{AppError, ErrorCode};

#[derive(Debug, Error)]
pub enum ScheduleError {
    /// Malformed input: blank title, start >= end, outside hours, bad month
    #[error("{message}")]
    Validation { code: ErrorCode, message: String },

    /// Candidate overlaps a WAIT or ACCEPT reservation
    #[error("Slot already reserved")]
    Conflict { conflicting_id: i64 },

    /// Caller lacks staff capability or does not own the reservation
    #[error("{message}")]
    Authorization { code: ErrorCode, message: String },

    #[error("Reservation {0} not found")]
    NotFound(i64),

    #[error("Persistence error: {0}")]
    Persistence(String),
}

impl ScheduleError {
    pub fn validation(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Validation {
            code,
            message: message.into(),
        }
    }

    pub fn staff_required() -> Self {
        Self::Authorization {
            code: ErrorCode::StaffRequired,
            message: "Only staff can manage reservations".to_string(),
        }
    }

    pub fn not_owner(id: i64) -> Self {
        Self::Authorization {
            code: ErrorCode::ReservationNotOwned,
            message: format!("Reservation {id} belongs to another user"),
        }
    }
}

/// Field validation helpers report through [`AppError`]
impl From<AppError> for ScheduleError {
    fn from(err: AppError) -> Self {
        Self::Validation {
            code: err.code,
            message: err.message,
        }
    }
}

impl From<RepoError> for ScheduleError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::Validation(msg) => Self::validation(ErrorCode::ValidationFailed, msg),
            other => Self::Persistence(other.to_string()),
        }
    }
}

impl From<ScheduleError> for AppError {
    fn from(err: ScheduleError) -> Self {
        match err {
            ScheduleError::Validation { code, message } => AppError::with_message(code, message),
            ScheduleError::Conflict { conflicting_id } => {
                AppError::new(ErrorCode::ReservationConflict)
                    .with_detail("conflicting_id", conflicting_id)
            }
            ScheduleError::Authorization { code, message } => {
                AppError::with_message(code, message)
            }
            ScheduleError::NotFound(id) => AppError::with_message(
                ErrorCode::ReservationNotFound,
                format!("Reservation {id} not found"),
            )
            .with_detail("reservation_id", id),
            ScheduleError::Persistence(msg) => AppError::database(msg),
        }
    }
}

pub type ScheduleResult<T> = Result<T, ScheduleError>;

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;

    #[test]
    fn test_conflict_maps_to_409_with_detail() {
        let err: AppError = ScheduleError::Conflict { conflicting_id: 9 }.into();
        assert_eq!(err.code, ErrorCode::ReservationConflict);
        assert_eq!(err.http_status(), StatusCode::CONFLICT);
        assert_eq!(err.message, "Slot already reserved");
        assert_eq!(err.details.unwrap().get("conflicting_id").unwrap(), 9);
    }

    #[test]
    fn test_authorization_maps_to_403() {
        let err: AppError = ScheduleError::staff_required().into();
        assert_eq!(err.code, ErrorCode::StaffRequired);
        assert_eq!(err.http_status(), StatusCode::FORBIDDEN);

        let err: AppError = ScheduleError::not_owner(3).into();
        assert_eq!(err.code, ErrorCode::ReservationNotOwned);
        assert_eq!(err.http_status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_validation_keeps_specific_code() {
        let err: AppError =
            ScheduleError::validation(ErrorCode::OutsideOperatingHours, "too early").into();
        assert_eq!(err.code, ErrorCode::OutsideOperatingHours);
        assert_eq!(err.http_status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_repo_errors_become_persistence() {
        let err = ScheduleError::from(RepoError::Database("disk I/O error".into()));
        assert!(matches!(err, ScheduleError::Persistence(_)));
        let app: AppError = err.into();
        assert_eq!(app.http_status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
