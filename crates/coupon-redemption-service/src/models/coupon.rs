//! 优惠券与兑换记录实体

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 优惠券
///
/// 归属于唯一一个奖励，被兑换后永久分配给一个玩家
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Coupon {
    pub id: i32,
    pub reward_id: i32,
    /// 可兑换的券码内容，对本服务不透明
    pub value: String,
}

/// 对外返回的优惠券视图
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CouponView {
    pub id: i32,
    pub value: String,
}

impl From<Coupon> for CouponView {
    fn from(coupon: Coupon) -> Self {
        Self {
            id: coupon.id,
            value: coupon.value,
        }
    }
}

/// 兑换记录
///
/// 每张优惠券最多一条，创建后不再修改或删除
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PlayerCoupon {
    pub id: i64,
    pub player_id: i32,
    pub coupon_id: i32,
    pub redeemed_at: DateTime<Utc>,
}

/// 玩家兑换历史行（兑换记录关联优惠券所属奖励）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct RedemptionHistoryEntry {
    pub redemption_id: i64,
    pub player_id: i32,
    pub coupon_id: i32,
    pub reward_id: i32,
    pub redeemed_at: DateTime<Utc>,
}
