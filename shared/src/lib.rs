//! Shared types for the clubroom scheduler
//!
//! Error codes, the response envelope, reservation models and small
//! utilities used by the server and its API clients.

pub mod error;
pub mod models;
pub mod util;

// Re-exports
pub use axum::{Json, body};
pub use http;
pub use serde::{Deserialize, Serialize};
