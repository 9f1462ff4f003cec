//! 兑换资格评估
//!
//! 纯判定逻辑：给定玩家、奖励、玩家兑换历史和当前时刻，判断能否再兑换一次。
//!
//! 校验顺序决定多个条件同时不满足时调用方看到的原因：
//!
//! 1. 有效期（闭区间）
//! 2. 当日兑换次数 < per_day_limit
//! 3. 累计兑换次数 < total_limit
//!
//! 奖励是否存在由调用方在评估前处理。

use chrono::{DateTime, Utc};

use crate::clock::CalendarZone;
use crate::error::RedemptionError;
use crate::models::{Player, RedemptionHistoryEntry, Reward};

/// 拒绝原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denial {
    RewardNotValid,
    PerDayLimitExceeded { limit: i32 },
    TotalLimitExceeded { limit: i32 },
}

impl Denial {
    pub fn into_error(self, reward_id: i32) -> RedemptionError {
        match self {
            Self::RewardNotValid => RedemptionError::RewardNotValid(reward_id),
            Self::PerDayLimitExceeded { limit } => {
                RedemptionError::PerDayLimitExceeded { reward_id, limit }
            }
            Self::TotalLimitExceeded { limit } => {
                RedemptionError::TotalLimitExceeded { reward_id, limit }
            }
        }
    }
}

/// 评估结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Eligibility {
    /// 允许兑换，携带该奖励下的历史记录（调用方据此排除已领取的券）
    Allowed(Vec<RedemptionHistoryEntry>),
    Denied(Denial),
}

impl Eligibility {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed(_))
    }

    pub fn into_result(self, reward_id: i32) -> Result<Vec<RedemptionHistoryEntry>, RedemptionError> {
        match self {
            Self::Allowed(history) => Ok(history),
            Self::Denied(denial) => Err(denial.into_error(reward_id)),
        }
    }
}

/// 资格评估器
#[derive(Debug, Clone, Copy)]
pub struct EligibilityEvaluator {
    zone: CalendarZone,
}

impl EligibilityEvaluator {
    pub fn new(zone: CalendarZone) -> Self {
        Self { zone }
    }

    /// 评估玩家此刻能否兑换该奖励
    ///
    /// 限额比较为 `count >= limit` 即拒绝，因此 total_limit 为 0 时永远拒绝。
    pub fn evaluate(
        &self,
        player: &Player,
        reward: &Reward,
        history: &[RedemptionHistoryEntry],
        now: DateTime<Utc>,
    ) -> Eligibility {
        if !reward.is_active_at(now) {
            return Eligibility::Denied(Denial::RewardNotValid);
        }

        let reward_history: Vec<RedemptionHistoryEntry> = history
            .iter()
            .filter(|entry| entry.player_id == player.id && entry.reward_id == reward.id)
            .cloned()
            .collect();

        let today_count = reward_history
            .iter()
            .filter(|entry| self.zone.same_day(entry.redeemed_at, now))
            .count();
        if today_count as i64 >= i64::from(reward.per_day_limit) {
            return Eligibility::Denied(Denial::PerDayLimitExceeded {
                limit: reward.per_day_limit,
            });
        }

        if reward_history.len() as i64 >= i64::from(reward.total_limit) {
            return Eligibility::Denied(Denial::TotalLimitExceeded {
                limit: reward.total_limit,
            });
        }

        Eligibility::Allowed(reward_history)
    }
}
