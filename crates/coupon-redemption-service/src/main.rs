//! 优惠券兑换服务入口

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, bail};
use coupon_redemption::repository::MIGRATOR;
use coupon_redemption::{
    AppState, CalendarZone, EligibilityEvaluator, MemoryRedemptionStore, PgRedemptionStore,
    RedemptionService, RedemptionStore, SystemClock, router,
};
use coupon_shared::{config::AppConfig, database::Database, observability};
use tokio::net::TcpListener;
use tracing::info;

const SERVICE_NAME: &str = "coupon-redemption-service";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load(SERVICE_NAME).context("加载配置失败")?;

    let obs_config = config
        .observability
        .clone()
        .with_service_name(&config.service_name);
    let _guard = observability::init(&obs_config).await?;

    info!("Starting {} on {}", SERVICE_NAME, config.server_addr());

    let zone: CalendarZone = config
        .redemption
        .calendar_timezone
        .parse()
        .context("redemption.calendar_timezone 配置无效")?;
    let lock_timeout = config
        .redemption
        .lock_timeout()
        .context("redemption.lock_timeout_ms 配置无效")?;

    let store = build_store(&config, lock_timeout).await?;

    let redemption_service = Arc::new(RedemptionService::new(
        store.clone(),
        EligibilityEvaluator::new(zone),
        Arc::new(SystemClock),
    ));
    info!(calendar_timezone = ?zone, lock_timeout_ms = config.redemption.lock_timeout_ms, "RedemptionService initialized");

    let app = router(
        AppState::new(redemption_service, store),
        Duration::from_secs(config.server.request_timeout_seconds),
    );

    let listener = TcpListener::bind(config.server_addr()).await?;
    info!("Listening on {}", config.server_addr());

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");

    Ok(())
}

/// 按 storage.backend 构建存储
async fn build_store(
    config: &AppConfig,
    lock_timeout: Duration,
) -> anyhow::Result<Arc<dyn RedemptionStore>> {
    match config.storage.backend.as_str() {
        "postgres" => {
            let db = Database::connect(&config.database).await?;
            if config.database.run_migrations {
                db.run_migrations(&MIGRATOR).await?;
            }
            info!("Using PostgreSQL redemption store");
            Ok(Arc::new(PgRedemptionStore::new(db.pool().clone(), lock_timeout)))
        }
        "memory" => {
            let store = match &config.storage.seed_file {
                Some(path) => MemoryRedemptionStore::from_fixture_file(path, lock_timeout)?,
                None => MemoryRedemptionStore::new(lock_timeout),
            };
            info!("Using in-memory redemption store");
            Ok(Arc::new(store))
        }
        other => bail!("未知的存储后端: {}", other),
    }
}

/// 监听关闭信号
///
/// 收到 SIGTERM 或 Ctrl+C 后返回，触发 axum 的优雅关闭流程。
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, initiating graceful shutdown..."),
        _ = terminate => info!("Received SIGTERM, initiating graceful shutdown..."),
    }
}
