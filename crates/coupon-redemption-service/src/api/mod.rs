//! HTTP 接口层
//!
//! 路由、处理器与错误响应映射。

pub mod error;
pub mod handlers;

use std::sync::Arc;
use std::time::Duration;

use axum::error_handling::HandleErrorLayer;
use axum::routing::{get, post};
use axum::{BoxError, Router, middleware};
use coupon_shared::observability::middleware as obs_middleware;
use tower::ServiceBuilder;
use tower::timeout::TimeoutLayer;
use tower::timeout::error::Elapsed;

use crate::error::RedemptionError;
use crate::repository::RedemptionStore;
use crate::service::RedemptionService;

pub use error::ApiError;

/// 处理器共享状态
#[derive(Clone)]
pub struct AppState {
    pub redemption_service: Arc<RedemptionService>,
    pub store: Arc<dyn RedemptionStore>,
}

impl AppState {
    pub fn new(redemption_service: Arc<RedemptionService>, store: Arc<dyn RedemptionStore>) -> Self {
        Self {
            redemption_service,
            store,
        }
    }
}

/// 构建服务路由
///
/// 处理超时的请求返回 408，响应体与其他错误一样是 `{statusCode, message, code}`。
pub fn router(state: AppState, request_timeout: Duration) -> Router {
    Router::new()
        .route("/coupon-redeem", post(handlers::redeem_coupon))
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(handle_layer_error))
                .layer(TimeoutLayer::new(request_timeout)),
        )
        // 可观测性中间件：请求追踪和指标收集
        .layer(middleware::from_fn(obs_middleware::http_tracing))
        .layer(middleware::from_fn(obs_middleware::request_id))
        .with_state(state)
}

async fn handle_layer_error(err: BoxError) -> ApiError {
    if err.is::<Elapsed>() {
        ApiError::Timeout
    } else {
        ApiError::Redemption(RedemptionError::Internal(err.to_string()))
    }
}
