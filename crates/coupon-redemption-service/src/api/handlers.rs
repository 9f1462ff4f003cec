//! HTTP 处理器

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use serde_json::{Value, json};
use validator::Validate;

use super::AppState;
use super::error::ApiError;
use crate::models::CouponView;
use crate::service::RedeemCouponRequest;

const SERVICE_NAME: &str = "coupon-redemption-service";

/// POST /coupon-redeem
///
/// 成功返回 201 和兑换到的 `{id, value}`。
pub async fn redeem_coupon(
    State(state): State<AppState>,
    payload: Result<Json<RedeemCouponRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CouponView>), ApiError> {
    let Json(request) = payload?;
    request.validate()?;

    let coupon = state.redemption_service.redeem(request).await?;

    Ok((StatusCode::CREATED, Json(coupon)))
}

/// 存活探针：服务进程正常即返回 ok
pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": SERVICE_NAME
    }))
}

/// 就绪探针：检查存储是否可用
pub async fn readiness_check(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let store_ok = state.store.health_check().await.is_ok();
    let status = if store_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(json!({
            "status": if store_ok { "ok" } else { "degraded" },
            "service": SERVICE_NAME,
            "checks": {
                "store": if store_ok { "ok" } else { "fail" }
            }
        })),
    )
}
