//! Unified error codes for the clubroom server
//!
//! Error codes are organized by category:
//! - 0xxx: General errors
//! - 1xxx: Authentication errors
//! - 2xxx: Permission errors
//! - 7xxx: Reservation errors
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// Serialized as a plain `u16` so the frontend can switch on it directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Operation completed successfully
    Success = 0,
    /// Validation failed
    ValidationFailed = 2,

    // ==================== 1xxx: Auth ====================
    /// User is not authenticated
    NotAuthenticated = 1001,
    /// Token has expired
    TokenExpired = 1003,
    /// Token is invalid
    TokenInvalid = 1004,

    // ==================== 2xxx: Permission ====================
    /// Staff capability required
    StaffRequired = 2006,

    // ==================== 7xxx: Reservation ====================
    /// Reservation not found
    ReservationNotFound = 7001,
    /// Requested slot overlaps a waiting or accepted reservation
    ReservationConflict = 7002,
    /// Requested slot is outside operating hours
    OutsideOperatingHours = 7003,
    /// Start is not before end, or start and end fall on different local days
    InvalidTimeRange = 7004,
    /// Reservation belongs to another requester
    ReservationNotOwned = 7005,

    // ==================== 9xxx: System ====================
    /// Database error
    DatabaseError = 9002,
}

impl ErrorCode {
    /// Get the numeric code value
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Check if this is a success code
    #[inline]
    pub const fn is_success(&self) -> bool {
        matches!(self, ErrorCode::Success)
    }

    /// Get the developer-facing English message for this error code
    pub const fn message(&self) -> &'static str {
        match self {
            // General
            ErrorCode::Success => "Operation completed successfully",
            ErrorCode::ValidationFailed => "Validation failed",

            // Auth
            ErrorCode::NotAuthenticated => "User is not authenticated",
            ErrorCode::TokenExpired => "Authentication token has expired",
            ErrorCode::TokenInvalid => "Authentication token is invalid",

            // Permission
            ErrorCode::StaffRequired => "Staff capability is required",

            // Reservation
            ErrorCode::ReservationNotFound => "Reservation not found",
            ErrorCode::ReservationConflict => "Slot already reserved",
            ErrorCode::OutsideOperatingHours => "Reservation is outside operating hours",
            ErrorCode::InvalidTimeRange => "Invalid reservation time range",
            ErrorCode::ReservationNotOwned => "Reservation belongs to another user",

            // System
            ErrorCode::DatabaseError => "Database error",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{:04}", self.code())
    }
}

impl From<ErrorCode> for u16 {
    #[inline]
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// Error when converting from an invalid u16 to ErrorCode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            // General
            0 => Ok(ErrorCode::Success),
            2 => Ok(ErrorCode::ValidationFailed),

            // Auth
            1001 => Ok(ErrorCode::NotAuthenticated),
            1003 => Ok(ErrorCode::TokenExpired),
            1004 => Ok(ErrorCode::TokenInvalid),

            // Permission
            2006 => Ok(ErrorCode::StaffRequired),

            // Reservation
            7001 => Ok(ErrorCode::ReservationNotFound),
            7002 => Ok(ErrorCode::ReservationConflict),
            7003 => Ok(ErrorCode::OutsideOperatingHours),
            7004 => Ok(ErrorCode::InvalidTimeRange),
            7005 => Ok(ErrorCode::ReservationNotOwned),

            // System
            9002 => Ok(ErrorCode::DatabaseError),

            _ => Err(InvalidErrorCode(value)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_roundtrip_through_u16() {
        for code in [
            ErrorCode::Success,
            ErrorCode::StaffRequired,
            ErrorCode::ReservationConflict,
            ErrorCode::DatabaseError,
        ] {
            assert_eq!(ErrorCode::try_from(code.code()), Ok(code));
        }
    }

    #[test]
    fn test_unknown_code_rejected() {
        assert_eq!(ErrorCode::try_from(4242), Err(InvalidErrorCode(4242)));
        // Only codes the server can emit are decodable
        for retired in [1, 3, 4, 8, 2001, 2003, 9001, 9004] {
            assert!(ErrorCode::try_from(retired).is_err(), "{retired}");
        }
    }

    #[test]
    fn test_serializes_as_number() {
        let json = serde_json::to_string(&ErrorCode::ReservationConflict).unwrap();
        assert_eq!(json, "7002");
    }

    #[test]
    fn test_display_is_zero_padded() {
        assert_eq!(ErrorCode::ValidationFailed.to_string(), "E0002");
        assert_eq!(ErrorCode::ReservationNotFound.to_string(), "E7001");
    }
}
