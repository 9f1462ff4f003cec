//! Prometheus 指标模块
//!
//! 基于 metrics crate 和 metrics-exporter-prometheus 实现指标收集与导出。
//! 指标通过独立的 HTTP 端口暴露，供 Prometheus 抓取。

use anyhow::Result;
use axum::{Router, routing::get};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::{error, info};

use super::ObservabilityConfig;

/// 奖励尚未解析时使用的标签值
pub const UNKNOWN_REWARD: &str = "unknown";

/// Metrics 资源守卫
pub struct MetricsHandle {
    server_handle: tokio::task::JoinHandle<()>,
}

impl Drop for MetricsHandle {
    fn drop(&mut self) {
        self.server_handle.abort();
    }
}

/// 初始化 Prometheus 指标导出
///
/// 启动一个独立的 HTTP 服务器在指定端口暴露 `/metrics` 端点。
pub async fn init(config: &ObservabilityConfig) -> Result<MetricsHandle> {
    let handle = PrometheusBuilder::new().install_recorder()?;

    register_common_metrics(&config.service_name);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.metrics_port));
    let server_handle = start_metrics_server(addr, handle).await?;

    Ok(MetricsHandle { server_handle })
}

/// 注册指标描述，出现在 /metrics 的 HELP 注释中
fn register_common_metrics(service_name: &str) {
    metrics::describe_counter!("http_requests_total", "Total number of HTTP requests");
    metrics::describe_histogram!(
        "http_request_duration_seconds",
        "HTTP request duration in seconds"
    );

    metrics::describe_counter!(
        "coupon_redemptions_total",
        "Total number of coupon redemption attempts by outcome"
    );
    metrics::describe_histogram!(
        "coupon_redemption_duration_seconds",
        "Coupon redemption duration in seconds"
    );

    metrics::counter!("service_starts_total", "service" => service_name.to_string()).increment(1);
}

/// 启动指标 HTTP 服务器
async fn start_metrics_server(
    addr: SocketAddr,
    handle: PrometheusHandle,
) -> Result<tokio::task::JoinHandle<()>> {
    let app = Router::new()
        .route("/metrics", get(move || std::future::ready(handle.render())))
        .route("/health", get(|| async { "OK" }));

    let listener = TcpListener::bind(addr).await?;
    info!("Metrics server listening on {}", addr);

    let server_handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("Metrics server error: {}", e);
        }
    });

    Ok(server_handle)
}

/// 记录 HTTP 请求
///
/// path 应为路由模板（如 `/coupons/{id}`），不要传入原始 URI。
#[inline]
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let status_str = status.to_string();
    metrics::counter!(
        "http_requests_total",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status_str.clone()
    )
    .increment(1);

    metrics::histogram!(
        "http_request_duration_seconds",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status_str
    )
    .record(duration_secs);
}

/// 记录一次兑换尝试
///
/// outcome 为 success 或错误码，stage 为请求终止时所处的阶段。
/// reward_id 只在奖励已从存储中解析出来时传入，否则记为 `unknown`，
/// 客户端随意提交的 id 不会产生新的时间序列。
#[inline]
pub fn record_redemption(
    reward_id: Option<i32>,
    outcome: &str,
    stage: &str,
    duration_secs: f64,
) {
    let reward_label = reward_id
        .map(|id| id.to_string())
        .unwrap_or_else(|| UNKNOWN_REWARD.to_string());

    metrics::counter!(
        "coupon_redemptions_total",
        "reward_id" => reward_label.clone(),
        "outcome" => outcome.to_string(),
        "stage" => stage.to_string()
    )
    .increment(1);

    metrics::histogram!(
        "coupon_redemption_duration_seconds",
        "reward_id" => reward_label
    )
    .record(duration_secs);
}
