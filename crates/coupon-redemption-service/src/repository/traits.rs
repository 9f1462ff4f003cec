//! 存储契约
//!
//! 服务层只依赖这里的抽象。一次兑换在一个 `RedemptionUnit` 内完成：
//! 开启时即按 (玩家, 奖励) 串行化，未提交就被丢弃的单元不留下任何写入。

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::{Coupon, Player, PlayerCoupon, RedemptionHistoryEntry, Reward};

/// 兑换存储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RedemptionStore: Send + Sync {
    async fn find_player(&self, id: i32) -> Result<Option<Player>>;
    async fn find_reward(&self, id: i32) -> Result<Option<Reward>>;

    /// 开启一个兑换单元，返回前已取得 (player_id, reward_id) 的排他锁
    ///
    /// 在锁等待超时内无法取得时返回 `AllocationConflict`。
    async fn begin(&self, player_id: i32, reward_id: i32) -> Result<Box<dyn RedemptionUnit>>;

    async fn health_check(&self) -> Result<()>;
}

/// 原子兑换单元
///
/// 所有读写在同一个原子边界内，`commit` 之前的写入对外不可见。
#[async_trait]
pub trait RedemptionUnit: Send {
    /// 玩家全部兑换记录，关联每条记录所属奖励
    async fn load_history(&mut self, player_id: i32) -> Result<Vec<RedemptionHistoryEntry>>;

    /// 选出奖励下一张尚未被任何人兑换、且不在排除列表中的优惠券，按 id 升序取第一张
    async fn select_unassigned_coupon(
        &mut self,
        reward_id: i32,
        exclude: &[i32],
    ) -> Result<Option<Coupon>>;

    /// 写入兑换记录；优惠券已有兑换记录时返回 `AllocationConflict`
    async fn insert_redemption(
        &mut self,
        player_id: i32,
        coupon_id: i32,
        redeemed_at: DateTime<Utc>,
    ) -> Result<PlayerCoupon>;

    async fn commit(self: Box<Self>) -> Result<()>;
}
