//! 优惠券分配
//!
//! 在已取得 (玩家, 奖励) 锁的兑换单元内，为玩家挑选一张未被任何人兑换的券并写入兑换记录。
//! 同一张券只能分配一次，由存储层的唯一约束兜底。

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::error::{RedemptionError, Result};
use crate::models::{Coupon, PlayerCoupon, Reward};
use crate::repository::RedemptionUnit;

/// 优惠券分配器
#[derive(Debug, Default, Clone, Copy)]
pub struct CouponAllocator;

impl CouponAllocator {
    pub fn new() -> Self {
        Self
    }

    /// 分配一张券并写入兑换记录
    ///
    /// `taken` 为玩家在该奖励下已持有的券 id。候选券按 id 升序取第一张，
    /// 没有可用券时返回 `CouponNotFound`，不产生任何写入。
    pub async fn allocate(
        &self,
        unit: &mut dyn RedemptionUnit,
        player_id: i32,
        reward: &Reward,
        taken: &[i32],
        redeemed_at: DateTime<Utc>,
    ) -> Result<(Coupon, PlayerCoupon)> {
        let coupon = unit
            .select_unassigned_coupon(reward.id, taken)
            .await?
            .ok_or(RedemptionError::CouponNotFound(reward.id))?;

        let record = unit
            .insert_redemption(player_id, coupon.id, redeemed_at)
            .await?;

        debug!(
            player_id,
            reward_id = reward.id,
            coupon_id = coupon.id,
            redemption_id = record.id,
            "Coupon allocated"
        );

        Ok((coupon, record))
    }
}
