//! Reservation API 模块 (活动室预约)
//!
//! | 路径 | 方法 | 说明 | 认证 |
//! |------|------|------|------|
//! | /api/reservations?year&month[&roomId] | GET | 月历 (不含 DECLINE) | 无 |
//! | /api/reservations | POST | 申请预约 | Bearer |
//! | /api/reservations/my?year&month | GET | 我的预约 | Bearer |
//! | /api/reservations/waiting[?roomId] | GET | 待审批列表 | Bearer, staff |
//! | /api/reservations/{id} | GET | 单个预约 | 无 |
//! | /api/reservations/{id} | DELETE | 取消预约 | Bearer, 本人 |
//! | /api/reservations/{id}/accept | PATCH | 批准 | Bearer, staff |
//! | /api/reservations/{id}/reject | PATCH | 拒绝 | Bearer, staff |

mod handler;

use axum::{
    Router,
    routing::{get, patch},
};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/reservations", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/", get(handler::list_month).post(handler::create))
        .route("/my", get(handler::list_mine))
        .route("/waiting", get(handler::list_waiting))
        .route("/{id}", get(handler::get_by_id).delete(handler::delete))
        .route("/{id}/accept", patch(handler::accept))
        .route("/{id}/reject", patch(handler::reject))
}
