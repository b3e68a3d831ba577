//! Reservation API Handlers

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;

use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::scheduler::{Actor, Decision};
use crate::utils::{ApiResponse, AppResult};
use shared::models::{Reservation, ReservationCreate};

/// 月份查询参数
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthQuery {
    pub year: i32,
    pub month: u32,
    #[serde(default, alias = "studyId")]
    pub room_id: Option<i64>,
}

/// 待审批列表查询参数
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomQuery {
    #[serde(default, alias = "studyId")]
    pub room_id: Option<i64>,
}

/// GET /api/reservations - 月历 (WAIT + ACCEPT)
pub async fn list_month(
    State(state): State<ServerState>,
    Query(query): Query<MonthQuery>,
) -> AppResult<ApiResponse<Vec<Reservation>>> {
    let reservations = state
        .workflow
        .for_month(query.room_id, query.year, query.month)
        .await?;
    Ok(ApiResponse::success(reservations))
}

/// GET /api/reservations/my - 我的预约 (全部状态)
pub async fn list_mine(
    State(state): State<ServerState>,
    current_user: CurrentUser,
    Query(query): Query<MonthQuery>,
) -> AppResult<ApiResponse<Vec<Reservation>>> {
    let reservations = state
        .workflow
        .mine(current_user.id, query.year, query.month)
        .await?;
    Ok(ApiResponse::success(reservations))
}

/// GET /api/reservations/waiting - 待审批列表
pub async fn list_waiting(
    State(state): State<ServerState>,
    current_user: CurrentUser,
    Query(query): Query<RoomQuery>,
) -> AppResult<ApiResponse<Vec<Reservation>>> {
    let actor = Actor::from(&current_user);
    let reservations = state.workflow.waiting(query.room_id, &actor).await?;
    Ok(ApiResponse::success(reservations))
}

/// GET /api/reservations/{id} - 获取单个预约
pub async fn get_by_id(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> AppResult<ApiResponse<Reservation>> {
    let reservation = state.workflow.get(id).await?;
    Ok(ApiResponse::success(reservation))
}

/// POST /api/reservations - 申请预约 (WAIT)
pub async fn create(
    State(state): State<ServerState>,
    current_user: CurrentUser,
    Json(payload): Json<ReservationCreate>,
) -> AppResult<ApiResponse<Reservation>> {
    let actor = Actor::from(&current_user);
    let reservation = state.workflow.propose(payload, &actor).await?;
    Ok(ApiResponse::success(reservation))
}

/// PATCH /api/reservations/{id}/accept - 批准
pub async fn accept(
    State(state): State<ServerState>,
    current_user: CurrentUser,
    Path(id): Path<i64>,
) -> AppResult<ApiResponse<Reservation>> {
    decide(&state, &current_user, id, Decision::Accept).await
}

/// PATCH /api/reservations/{id}/reject - 拒绝
pub async fn reject(
    State(state): State<ServerState>,
    current_user: CurrentUser,
    Path(id): Path<i64>,
) -> AppResult<ApiResponse<Reservation>> {
    decide(&state, &current_user, id, Decision::Decline).await
}

async fn decide(
    state: &ServerState,
    current_user: &CurrentUser,
    id: i64,
    decision: Decision,
) -> AppResult<ApiResponse<Reservation>> {
    let actor = Actor::from(current_user);
    let reservation = state.workflow.decide(id, decision, &actor).await?;
    Ok(ApiResponse::success(reservation))
}

/// DELETE /api/reservations/{id} - 取消预约 (仅本人)
pub async fn delete(
    State(state): State<ServerState>,
    current_user: CurrentUser,
    Path(id): Path<i64>,
) -> AppResult<ApiResponse<bool>> {
    let actor = Actor::from(&current_user);
    state.workflow.cancel(id, &actor).await?;
    Ok(ApiResponse::success(true))
}
