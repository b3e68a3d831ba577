//! API 路由模块
//!
//! - [`health`] - 健康检查
//! - [`reservations`] - 预约接口

pub mod health;
pub mod reservations;

use std::time::Duration;

use axum::{Router, middleware};
use http::StatusCode;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::core::ServerState;

/// HTTP 请求日志中间件
async fn log_request(
    request: http::Request<axum::body::Body>,
    next: middleware::Next,
) -> http::Response<axum::body::Body> {
    let method = request.method().clone();
    let uri = request.uri().clone();

    let response = next.run(request).await;

    tracing::info!(target: "http_access", "{} {} {}", method, uri, response.status());

    response
}

/// Build a router with all routes registered (no middleware, no state)
pub fn build_router() -> Router<ServerState> {
    Router::new()
        // Health API - public route
        .merge(health::router())
        // Reservation API - mixed public / bearer routes
        .merge(reservations::router())
}

/// Build the fully configured application
///
/// Used by the HTTP server and by tests.
pub fn build_app(state: ServerState) -> Router {
    let timeout = Duration::from_millis(state.config.request_timeout_ms);
    health::mark_started();

    with_middleware(build_router().with_state(state), timeout)
}

/// 统一中间件栈: 超时 (408) / CORS / 访问日志 / trace
fn with_middleware(router: Router, timeout: Duration) -> Router {
    router
        // ========== Tower HTTP Middleware ==========
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            timeout,
        ))
        .layer(CorsLayer::permissive())
        .layer(middleware::from_fn(log_request))
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::routing::get;
    use tower::ServiceExt;

    fn app(timeout_ms: u64) -> Router {
        let router = Router::new().route(
            "/slow",
            get(|| async {
                tokio::time::sleep(Duration::from_millis(200)).await;
                "done"
            }),
        );
        with_middleware(router, Duration::from_millis(timeout_ms))
    }

    async fn status_of(app: Router) -> StatusCode {
        let request = http::Request::builder()
            .uri("/slow")
            .body(Body::empty())
            .unwrap();
        app.oneshot(request).await.unwrap().status()
    }

    #[tokio::test]
    async fn test_slow_request_times_out_with_408() {
        assert_eq!(status_of(app(20)).await, StatusCode::REQUEST_TIMEOUT);
    }

    #[tokio::test]
    async fn test_request_within_timeout_passes() {
        assert_eq!(status_of(app(5_000)).await, StatusCode::OK);
    }
}
