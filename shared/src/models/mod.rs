//! Data models
//!
//! Shared between the server and the frontend (via API).
//! All IDs are `i64` (SQLite INTEGER PRIMARY KEY).

pub mod reservation;

// Re-exports
pub use reservation::*;
