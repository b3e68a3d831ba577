use std::sync::Arc;

use sqlx::SqlitePool;

use crate::auth::JwtService;
use crate::core::{Config, ServerError};
use crate::db::DbService;
use crate::scheduler::{ReservationWorkflow, SqliteReservationStore};

/// 服务器状态 - 持有所有服务的共享引用
///
/// 使用 Arc 实现浅拷贝，clone 进每个 axum handler。
///
/// | 字段 | 类型 | 说明 |
/// |------|------|------|
/// | config | Config | 配置项 (不可变) |
/// | pool | SqlitePool | SQLite 连接池 |
/// | jwt_service | Arc<JwtService> | JWT 认证服务 |
/// | workflow | ReservationWorkflow | 预约审批流程 |
#[derive(Clone)]
pub struct ServerState {
    /// 服务器配置
    pub config: Config,
    /// SQLite 连接池
    pub pool: SqlitePool,
    /// JWT 认证服务 (Arc 共享所有权)
    pub jwt_service: Arc<JwtService>,
    /// 预约审批流程
    pub workflow: ReservationWorkflow,
}

impl ServerState {
    /// 使用已打开的连接池构造状态
    ///
    /// 测试中配合内存数据库使用
    pub fn new(config: Config, pool: SqlitePool, jwt_service: Arc<JwtService>) -> Self {
        let store = SqliteReservationStore::new(pool.clone(), config.timezone);
        let workflow = ReservationWorkflow::new(
            Arc::new(store),
            config.operating_hours(),
            config.default_room_id,
        );
        Self {
            config,
            pool,
            jwt_service,
            workflow,
        }
    }

    /// 初始化服务器状态
    ///
    /// 按顺序初始化：
    /// 1. 校验营业时间配置
    /// 2. 数据库 (work_dir/clubroom.db, 自动迁移)
    /// 3. JWT 服务与预约流程
    pub async fn initialize(config: &Config) -> Result<Self, ServerError> {
        if config.open_time >= config.close_time {
            return Err(ServerError::Config(format!(
                "OPEN_TIME ({}) must be before CLOSE_TIME ({})",
                config.open_time, config.close_time
            )));
        }

        std::fs::create_dir_all(&config.work_dir)?;
        let db = DbService::new(&config.database_path())
            .await
            .map_err(|e| ServerError::Database(e.message))?;

        let jwt_service = Arc::new(JwtService::with_config(config.jwt.clone()));

        tracing::info!(
            timezone = %config.timezone,
            open = %config.open_time,
            close = %config.close_time,
            default_room_id = config.default_room_id,
            "Reservation workflow configured"
        );

        Ok(Self::new(config.clone(), db.pool, jwt_service))
    }

    pub fn get_jwt_service(&self) -> Arc<JwtService> {
        self.jwt_service.clone()
    }
}
