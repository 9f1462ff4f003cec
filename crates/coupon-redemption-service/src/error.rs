//! 兑换服务错误类型
//!
//! 定义业务拒绝原因和系统错误。业务错误的 Display 文案即对外返回的 message。

use thiserror::Error;

/// 兑换服务错误类型
#[derive(Debug, Error)]
pub enum RedemptionError {
    // === 查找失败 ===
    #[error("Player not found")]
    PlayerNotFound(i32),

    #[error("Reward not found")]
    RewardNotFound(i32),

    // === 资格校验拒绝 ===
    #[error("Reward is not valid at the moment")]
    RewardNotValid(i32),

    #[error("Player has exceeded the per day limit")]
    PerDayLimitExceeded { reward_id: i32, limit: i32 },

    #[error("Player has exceeded the total limit")]
    TotalLimitExceeded { reward_id: i32, limit: i32 },

    // === 分配失败 ===
    #[error("Coupon is not found")]
    CouponNotFound(i32),

    #[error("Coupon allocation conflicted with a concurrent request, please retry")]
    AllocationConflict,

    // === 系统错误 ===
    #[error("数据库错误: {0}")]
    Database(#[from] sqlx::Error),

    #[error("内部错误: {0}")]
    Internal(String),
}

/// 兑换服务 Result 类型别名
pub type Result<T> = std::result::Result<T, RedemptionError>;

impl RedemptionError {
    /// 只有并发冲突可以整体重试，此时没有任何副作用
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::AllocationConflict)
    }

    /// 检查是否为业务错误（非系统错误）
    pub fn is_business_error(&self) -> bool {
        !matches!(self, Self::Database(_) | Self::Internal(_))
    }

    /// 获取错误码（用于 API 响应与指标）
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::PlayerNotFound(_) => "PLAYER_NOT_FOUND",
            Self::RewardNotFound(_) => "REWARD_NOT_FOUND",
            Self::RewardNotValid(_) => "REWARD_NOT_VALID",
            Self::PerDayLimitExceeded { .. } => "PER_DAY_LIMIT_EXCEEDED",
            Self::TotalLimitExceeded { .. } => "TOTAL_LIMIT_EXCEEDED",
            Self::CouponNotFound(_) => "COUPON_NOT_FOUND",
            Self::AllocationConflict => "ALLOCATION_CONFLICT",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}
