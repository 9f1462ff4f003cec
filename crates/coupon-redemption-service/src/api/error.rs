//! HTTP 错误响应
//!
//! 业务拒绝与参数错误返回 400 `{statusCode, message, code}`；
//! 处理超时返回 408；系统错误返回 500 和通用提示，详细信息只写日志。

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::error::RedemptionError;

const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

/// API 层错误
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Redemption(#[from] RedemptionError),

    #[error("{0}")]
    Validation(String),

    #[error("Request timed out")]
    Timeout,
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Redemption(e) if !e.is_business_error() => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Timeout => StatusCode::REQUEST_TIMEOUT,
            _ => StatusCode::BAD_REQUEST,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Redemption(e) => e.error_code(),
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Timeout => "REQUEST_TIMEOUT",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let message = match &self {
            Self::Redemption(e) if !e.is_business_error() => {
                tracing::error!(error = %e, code = e.error_code(), "Request failed with internal error");
                INTERNAL_ERROR_MESSAGE.to_string()
            }
            other => other.to_string(),
        };

        let body = json!({
            "statusCode": status.as_u16(),
            "message": message,
            "code": self.error_code(),
        });

        (status, Json(body)).into_response()
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self::Validation(errors.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_business_error_is_bad_request_with_message() {
        let response = ApiError::from(RedemptionError::TotalLimitExceeded {
            reward_id: 21,
            limit: 1,
        })
        .into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await,
            json!({
                "statusCode": 400,
                "message": "Player has exceeded the total limit",
                "code": "TOTAL_LIMIT_EXCEEDED"
            })
        );
    }

    #[tokio::test]
    async fn test_allocation_conflict_is_bad_request() {
        let response = ApiError::from(RedemptionError::AllocationConflict).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = body_json(response).await;
        assert_eq!(body["code"], "ALLOCATION_CONFLICT");
    }

    #[tokio::test]
    async fn test_internal_error_hides_detail() {
        let response = ApiError::from(RedemptionError::Internal(
            "connection reset by peer".to_string(),
        ))
        .into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["statusCode"], 500);
        assert_eq!(body["message"], "Internal server error");
        assert_eq!(body["code"], "INTERNAL_ERROR");
    }

    #[tokio::test]
    async fn test_timeout_keeps_error_body_shape() {
        let response = ApiError::Timeout.into_response();
        assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);
        assert_eq!(
            body_json(response).await,
            json!({
                "statusCode": 408,
                "message": "Request timed out",
                "code": "REQUEST_TIMEOUT"
            })
        );
    }

    #[tokio::test]
    async fn test_validation_error_is_bad_request() {
        let response = ApiError::Validation("playerId 必须为正整数".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = body_json(response).await;
        assert_eq!(body["code"], "VALIDATION_ERROR");
        assert_eq!(body["message"], "playerId 必须为正整数");
    }
}
