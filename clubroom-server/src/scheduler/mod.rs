//! Clubroom reservation scheduler
//!
//! - [`conflict`] - interval overlap and operating-hours checks (pure)
//! - [`store`] - [`ReservationStore`] trait and its SQLite implementation
//! - [`workflow`] - WAIT / ACCEPT / DECLINE state machine and authorization
//! - [`calendar`] - local month windows

pub mod calendar;
pub mod conflict;
pub mod error;
pub mod store;
pub mod workflow;

pub use calendar::MonthWindow;
pub use conflict::{OperatingHours, Slot, find_conflict, has_conflict};
pub use error::{ScheduleError, ScheduleResult};
pub use store::{NewReservation, ReservationStore, SqliteReservationStore};
pub use workflow::{Actor, Decision, ReservationWorkflow};
