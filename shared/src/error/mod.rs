//! Unified error system for the clubroom server
//!
//! - [`ErrorCode`]: standardized numeric error codes
//! - [`ErrorCategory`]: classification of errors by code range
//! - [`AppError`]: error type with code, message and details
//! - [`ApiResponse`]: unified response envelope
//!
//! # Error Code Ranges
//!
//! - 0xxx: General errors
//! - 1xxx: Authentication errors
//! - 2xxx: Permission errors
//! - 7xxx: Reservation errors
//! - 9xxx: System errors
//!
//! # Example
//!
//! ```
//! use shared::error::{AppError, ErrorCode, ApiResponse};
//!
//! let err = AppError::new(ErrorCode::ReservationConflict)
//!     .with_detail("conflicting_id", 42);
//!
//! let response = ApiResponse::<()>::error(&err);
//! assert_eq!(response.code, Some(7002));
//! ```

mod category;
mod codes;
mod http;
mod types;

pub use category::ErrorCategory;
pub use codes::{ErrorCode, InvalidErrorCode};
pub use types::{ApiResponse, AppError, AppResult};
