//! 认证授权模块
//!
//! - [`JwtService`] - JWT 令牌服务
//! - [`CurrentUser`] - 当前用户上下文 (axum 提取器)
//! - [`permissions`] - 员工审批权限定义

pub mod extractor;
pub mod jwt;
pub mod permissions;

pub use jwt::{Claims, CurrentUser, JwtConfig, JwtError, JwtService};
