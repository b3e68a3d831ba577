//! Permission Definitions
//!
//! Reservation approval is the only privileged capability. It is granted by
//! the token's `is_staff` flag, the admin role, or one of the permissions below
//! (`reservations:*` wildcards included).

/// Role that implies every permission
pub const ADMIN_ROLE: &str = "admin";

/// 超级权限
pub const ALL: &str = "all";

/// Accept / reject reservations and view the waiting queue
pub const RESERVATIONS_MANAGE: &str = "reservations:manage";
