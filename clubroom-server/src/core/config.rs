use chrono::NaiveTime;
use chrono_tz::Tz;

use crate::auth::JwtConfig;
use crate::scheduler::OperatingHours;
use crate::utils::time;

/// 服务器配置
///
/// # 环境变量
///
/// 所有配置项都可以通过环境变量覆盖：
///
/// | 环境变量 | 默认值 | 说明 |
/// |----------|--------|------|
/// | WORK_DIR | ./data | 工作目录 (数据库) |
/// | HTTP_PORT | 3000 | HTTP 服务端口 |
/// | ENVIRONMENT | development | 运行环境 |
/// | TIMEZONE | Asia/Seoul | 营业时间与月份窗口所用时区 |
/// | OPEN_TIME | 09:00 | 营业开始 |
/// | CLOSE_TIME | 23:00 | 营业结束 |
/// | DEFAULT_ROOM_ID | 1 | 未指定房间时使用 |
/// | REQUEST_TIMEOUT_MS | 30000 | 请求超时(毫秒) |
/// | LOG_LEVEL | info | 日志级别 |
/// | LOG_JSON | false | JSON 日志格式 |
/// | LOG_DIR | - | 日志目录 (按天滚动) |
///
/// # 示例
///
/// ```ignore
/// WORK_DIR=/data/clubroom HTTP_PORT=8080 TIMEZONE=Asia/Seoul cargo run
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// 工作目录，存储数据库文件
    pub work_dir: String,
    /// HTTP API 服务端口
    pub http_port: u16,
    /// JWT 认证配置
    pub jwt: JwtConfig,
    /// 运行环境: development | staging | production
    pub environment: String,
    /// 业务时区 (营业时间、月份窗口)
    pub timezone: Tz,
    /// 营业开始 (本地时间)
    pub open_time: NaiveTime,
    /// 营业结束 (本地时间，含)
    pub close_time: NaiveTime,
    /// 申请未指定房间时使用
    pub default_room_id: i64,
    /// 请求超时时间 (毫秒)
    pub request_timeout_ms: u64,
    /// 日志级别 (RUST_LOG 优先)
    pub log_level: String,
    pub log_json: bool,
    pub log_dir: Option<String>,
}

impl Config {
    /// 从环境变量加载配置
    ///
    /// 如果环境变量未设置或无法解析，使用默认值
    pub fn from_env() -> Self {
        Self {
            work_dir: std::env::var("WORK_DIR").unwrap_or_else(|_| "./data".into()),
            http_port: std::env::var("HTTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            jwt: JwtConfig::default(),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),
            timezone: time::parse_timezone(
                &std::env::var("TIMEZONE").unwrap_or_else(|_| time::DEFAULT_TIMEZONE.into()),
            ),
            open_time: time::parse_clock(
                &std::env::var("OPEN_TIME").unwrap_or_else(|_| "09:00".into()),
                time::DEFAULT_OPEN,
            ),
            close_time: time::parse_clock(
                &std::env::var("CLOSE_TIME").unwrap_or_else(|_| "23:00".into()),
                time::DEFAULT_CLOSE,
            ),
            default_room_id: std::env::var("DEFAULT_ROOM_ID")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(1),
            request_timeout_ms: std::env::var("REQUEST_TIMEOUT_MS")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(30000),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            log_json: std::env::var("LOG_JSON")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(false),
            log_dir: std::env::var("LOG_DIR").ok().filter(|d| !d.is_empty()),
        }
    }

    /// 使用自定义值覆盖部分配置
    ///
    /// 常用于测试场景
    pub fn with_overrides(work_dir: impl Into<String>, http_port: u16) -> Self {
        let mut config = Self::from_env();
        config.work_dir = work_dir.into();
        config.http_port = http_port;
        config
    }

    /// 数据库文件路径 (工作目录下)
    pub fn database_path(&self) -> String {
        std::path::Path::new(&self.work_dir)
            .join("clubroom.db")
            .to_string_lossy()
            .into_owned()
    }

    /// 营业时间窗口
    pub fn operating_hours(&self) -> OperatingHours {
        OperatingHours::new(self.open_time, self.close_time, self.timezone)
    }

    /// 是否生产环境
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// 是否开发环境
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
