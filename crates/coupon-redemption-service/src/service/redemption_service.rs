//! 优惠券兑换服务
//!
//! 一次兑换的完整流程：
//!
//! 1. 查找玩家 -> 2. 查找奖励 -> 3. 开启兑换单元（按玩家+奖励串行化）
//!    -> 4. 读取历史并评估资格 -> 5. 分配优惠券 -> 6. 提交
//!
//! 任一步失败整个请求失败，未提交的兑换单元被丢弃，不留下写入。请求内不做重试。

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use coupon_shared::observability::metrics::record_redemption;
use tracing::{debug, error, info, instrument, warn};

use crate::allocator::CouponAllocator;
use crate::clock::Clock;
use crate::eligibility::EligibilityEvaluator;
use crate::error::{RedemptionError, Result};
use crate::models::CouponView;
use crate::repository::RedemptionStore;
use crate::service::dto::RedeemCouponRequest;

/// 兑换阶段
///
/// 失败时记录的是失败发生前最后到达的阶段。阶段按流程先后排序。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RedemptionStage {
    Received,
    PlayerResolved,
    RewardResolved,
    Evaluated,
    Allocated,
    Completed,
}

impl RedemptionStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::PlayerResolved => "player_resolved",
            Self::RewardResolved => "reward_resolved",
            Self::Evaluated => "evaluated",
            Self::Allocated => "allocated",
            Self::Completed => "completed",
        }
    }
}

impl fmt::Display for RedemptionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 优惠券兑换服务
pub struct RedemptionService {
    store: Arc<dyn RedemptionStore>,
    evaluator: EligibilityEvaluator,
    allocator: CouponAllocator,
    clock: Arc<dyn Clock>,
}

impl RedemptionService {
    pub fn new(
        store: Arc<dyn RedemptionStore>,
        evaluator: EligibilityEvaluator,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            evaluator,
            allocator: CouponAllocator::new(),
            clock,
        }
    }

    /// 为玩家兑换奖励下的一张优惠券
    #[instrument(skip(self), fields(player_id = request.player_id, reward_id = request.reward_id))]
    pub async fn redeem(&self, request: RedeemCouponRequest) -> Result<CouponView> {
        let started = Instant::now();
        let mut stage = RedemptionStage::Received;

        let result = self.execute(&request, &mut stage).await;
        let elapsed = started.elapsed().as_secs_f64();
        // 奖励确认存在后才把 id 作为指标标签
        let reward_label = (stage >= RedemptionStage::RewardResolved).then_some(request.reward_id);

        match &result {
            Ok(coupon) => {
                record_redemption(reward_label, "success", stage.as_str(), elapsed);
                info!(coupon_id = coupon.id, "Coupon redeemed");
            }
            Err(e) => {
                record_redemption(reward_label, e.error_code(), stage.as_str(), elapsed);
                if e.is_business_error() {
                    warn!(stage = %stage, code = e.error_code(), error = %e, "Redemption rejected");
                } else {
                    error!(stage = %stage, code = e.error_code(), error = %e, "Redemption failed");
                }
            }
        }

        result
    }

    async fn execute(
        &self,
        request: &RedeemCouponRequest,
        stage: &mut RedemptionStage,
    ) -> Result<CouponView> {
        let player = self
            .store
            .find_player(request.player_id)
            .await?
            .ok_or(RedemptionError::PlayerNotFound(request.player_id))?;
        advance(stage, RedemptionStage::PlayerResolved);

        let reward = self
            .store
            .find_reward(request.reward_id)
            .await?
            .ok_or(RedemptionError::RewardNotFound(request.reward_id))?;
        advance(stage, RedemptionStage::RewardResolved);

        // 资格评估与分配都在持锁的单元内完成
        let mut unit = self.store.begin(player.id, reward.id).await?;

        let history = unit.load_history(player.id).await?;
        let reward_history = self
            .evaluator
            .evaluate(&player, &reward, &history, self.clock.now())
            .into_result(reward.id)?;
        advance(stage, RedemptionStage::Evaluated);

        let taken: Vec<i32> = reward_history.iter().map(|entry| entry.coupon_id).collect();
        let (coupon, _) = self
            .allocator
            .allocate(unit.as_mut(), player.id, &reward, &taken, self.clock.now())
            .await?;
        advance(stage, RedemptionStage::Allocated);

        unit.commit().await?;
        advance(stage, RedemptionStage::Completed);

        Ok(coupon.into())
    }
}

fn advance(stage: &mut RedemptionStage, next: RedemptionStage) {
    debug!(from = %stage, to = %next, "Redemption stage transition");
    *stage = next;
}
