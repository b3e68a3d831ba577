//! Clubroom Server - reservation scheduler for the club room
//!
//! # Architecture
//!
//! - **Scheduler** (`scheduler`): conflict checking, reservation store and
//!   the WAIT / ACCEPT / DECLINE approval workflow
//! - **Database** (`db`): SQLite via sqlx
//! - **Auth** (`auth`): bearer JWT validation and staff capability
//! - **HTTP API** (`api`): axum routes
//!
//! # Layout
//!
//! ```text
//! clubroom-server/src/
//! ├── core/          # config, state, server, errors
//! ├── auth/          # JWT, extractor, permissions
//! ├── scheduler/     # store, conflict checker, workflow
//! ├── api/           # HTTP routes and handlers
//! ├── db/            # connection pool and repositories
//! └── utils/         # logger, time, validation
//! ```

pub mod api;
pub mod auth;
pub mod core;
pub mod db;
pub mod scheduler;
pub mod utils;

pub use auth::{CurrentUser, JwtService};
pub use core::{Config, Server, ServerState};
pub use scheduler::{ReservationStore, ReservationWorkflow, ScheduleError, SqliteReservationStore};
pub use utils::{ApiResponse, AppError, AppResult, ErrorCategory, ErrorCode};

pub use utils::logger::{init_logger, init_logger_with_file};

// Security logging macro - 支持 tracing 格式说明符
#[macro_export]
macro_rules! security_log {
    ($level:expr, $event:expr, $($key:ident = $value:expr),*) => {
        tracing::info!(
            target: "security",
            level = $level,
            event = $event,
            $($key = $value),*
        );
    };
}

/// Prepare the process environment: work dir and logging
pub fn setup_environment(config: &Config) -> std::io::Result<()> {
    std::fs::create_dir_all(&config.work_dir)?;
    if let Some(dir) = &config.log_dir {
        std::fs::create_dir_all(dir)?;
    }
    init_logger_with_file(Some(&config.log_level), config.log_json, config.log_dir.as_deref());
    Ok(())
}

pub fn print_banner() {
    println!(
        r#"
       __      __
  ____/ /_  __/ /_  _________  ____  ____ ___
 / ___/ / / / / __ \/ ___/ __ \/ __ \/ __ `__ \
/ /__/ / /_/ / /_/ / /  / /_/ / /_/ / / / / / /
\___/_/\__,_/_.___/_/   \____/\____/_/ /_/ /_/
    "#
    );
}
