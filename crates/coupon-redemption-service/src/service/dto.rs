//! 服务层数据传输对象

use serde::{Deserialize, Serialize};
use validator::Validate;

/// 兑换优惠券请求
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RedeemCouponRequest {
    #[validate(range(min = 1, message = "playerId 必须为正整数"))]
    pub player_id: i32,
    #[validate(range(min = 1, message = "rewardId 必须为正整数"))]
    pub reward_id: i32,
}

impl RedeemCouponRequest {
    pub fn new(player_id: i32, reward_id: i32) -> Self {
        Self {
            player_id,
            reward_id,
        }
    }
}
