//! 内存兑换存储
//!
//! 适用于开发和测试环境。整个存储由一把异步互斥锁保护，一个兑换单元在其生命周期内
//! 独占该锁，写入先暂存，提交时才落到共享状态。

use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info};

use super::traits::{RedemptionStore, RedemptionUnit};
use crate::error::{RedemptionError, Result};
use crate::models::{Coupon, Player, PlayerCoupon, RedemptionHistoryEntry, Reward};

/// 内存存储初始数据
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryFixture {
    #[serde(default)]
    pub players: Vec<Player>,
    #[serde(default)]
    pub rewards: Vec<Reward>,
    #[serde(default)]
    pub coupons: Vec<Coupon>,
    #[serde(default)]
    pub redemptions: Vec<PlayerCoupon>,
}

#[derive(Debug, Default)]
struct MemoryState {
    players: BTreeMap<i32, Player>,
    rewards: BTreeMap<i32, Reward>,
    coupons: BTreeMap<i32, Coupon>,
    redemptions: Vec<PlayerCoupon>,
    next_redemption_id: i64,
}

impl MemoryState {
    fn is_assigned(&self, coupon_id: i32) -> bool {
        self.redemptions.iter().any(|r| r.coupon_id == coupon_id)
    }
}

/// 内存兑换存储
#[derive(Clone)]
pub struct MemoryRedemptionStore {
    state: Arc<Mutex<MemoryState>>,
    lock_timeout: Duration,
}

impl MemoryRedemptionStore {
    pub fn new(lock_timeout: Duration) -> Self {
        Self {
            state: Arc::new(Mutex::new(MemoryState::default())),
            lock_timeout,
        }
    }

    pub fn from_fixture(fixture: MemoryFixture, lock_timeout: Duration) -> Self {
        let next_redemption_id = fixture.redemptions.iter().map(|r| r.id).max().unwrap_or(0);
        let state = MemoryState {
            players: fixture.players.into_iter().map(|p| (p.id, p)).collect(),
            rewards: fixture.rewards.into_iter().map(|r| (r.id, r)).collect(),
            coupons: fixture.coupons.into_iter().map(|c| (c.id, c)).collect(),
            redemptions: fixture.redemptions,
            next_redemption_id,
        };

        Self {
            state: Arc::new(Mutex::new(state)),
            lock_timeout,
        }
    }

    /// 从 JSON 文件加载初始数据
    pub fn from_fixture_file(path: impl AsRef<Path>, lock_timeout: Duration) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            RedemptionError::Internal(format!("读取初始数据失败 {}: {}", path.display(), e))
        })?;
        let fixture: MemoryFixture = serde_json::from_str(&raw).map_err(|e| {
            RedemptionError::Internal(format!("解析初始数据失败 {}: {}", path.display(), e))
        })?;

        info!(
            path = %path.display(),
            players = fixture.players.len(),
            rewards = fixture.rewards.len(),
            coupons = fixture.coupons.len(),
            "Memory store seeded from fixture"
        );

        Ok(Self::from_fixture(fixture, lock_timeout))
    }

    pub async fn insert_player(&self, player: Player) {
        self.state.lock().await.players.insert(player.id, player);
    }

    pub async fn insert_reward(&self, reward: Reward) {
        self.state.lock().await.rewards.insert(reward.id, reward);
    }

    pub async fn insert_coupon(&self, coupon: Coupon) {
        self.state.lock().await.coupons.insert(coupon.id, coupon);
    }

    /// 已提交的兑换记录快照
    pub async fn redemptions(&self) -> Vec<PlayerCoupon> {
        self.state.lock().await.redemptions.clone()
    }
}

#[async_trait]
impl RedemptionStore for MemoryRedemptionStore {
    async fn find_player(&self, id: i32) -> Result<Option<Player>> {
        Ok(self.state.lock().await.players.get(&id).cloned())
    }

    async fn find_reward(&self, id: i32) -> Result<Option<Reward>> {
        Ok(self.state.lock().await.rewards.get(&id).cloned())
    }

    async fn begin(&self, player_id: i32, reward_id: i32) -> Result<Box<dyn RedemptionUnit>> {
        let guard = tokio::time::timeout(self.lock_timeout, self.state.clone().lock_owned())
            .await
            .map_err(|_| {
                debug!(player_id, reward_id, "Memory store lock wait timed out");
                RedemptionError::AllocationConflict
            })?;

        Ok(Box::new(MemoryRedemptionUnit {
            state: guard,
            pending: Vec::new(),
        }))
    }

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}

/// 持有存储锁的兑换单元，未提交的写入保存在 pending 中
struct MemoryRedemptionUnit {
    state: OwnedMutexGuard<MemoryState>,
    pending: Vec<PlayerCoupon>,
}

impl MemoryRedemptionUnit {
    fn is_assigned(&self, coupon_id: i32) -> bool {
        self.state.is_assigned(coupon_id) || self.pending.iter().any(|r| r.coupon_id == coupon_id)
    }
}

#[async_trait]
impl RedemptionUnit for MemoryRedemptionUnit {
    async fn load_history(&mut self, player_id: i32) -> Result<Vec<RedemptionHistoryEntry>> {
        let history = self
            .state
            .redemptions
            .iter()
            .chain(self.pending.iter())
            .filter(|r| r.player_id == player_id)
            .filter_map(|r| {
                self.state.coupons.get(&r.coupon_id).map(|c| RedemptionHistoryEntry {
                    redemption_id: r.id,
                    player_id: r.player_id,
                    coupon_id: r.coupon_id,
                    reward_id: c.reward_id,
                    redeemed_at: r.redeemed_at,
                })
            })
            .collect();

        Ok(history)
    }

    async fn select_unassigned_coupon(
        &mut self,
        reward_id: i32,
        exclude: &[i32],
    ) -> Result<Option<Coupon>> {
        let exclude: HashSet<i32> = exclude.iter().copied().collect();

        let coupon = self
            .state
            .coupons
            .values()
            .filter(|c| c.reward_id == reward_id && !exclude.contains(&c.id))
            .find(|c| !self.is_assigned(c.id))
            .cloned();

        Ok(coupon)
    }

    async fn insert_redemption(
        &mut self,
        player_id: i32,
        coupon_id: i32,
        redeemed_at: DateTime<Utc>,
    ) -> Result<PlayerCoupon> {
        if !self.state.coupons.contains_key(&coupon_id) {
            return Err(RedemptionError::Internal(format!(
                "coupon {} does not exist",
                coupon_id
            )));
        }
        if self.is_assigned(coupon_id) {
            return Err(RedemptionError::AllocationConflict);
        }

        self.state.next_redemption_id += 1;
        let record = PlayerCoupon {
            id: self.state.next_redemption_id,
            player_id,
            coupon_id,
            redeemed_at,
        };
        self.pending.push(record.clone());

        Ok(record)
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let MemoryRedemptionUnit { mut state, pending } = *self;
        state.redemptions.extend(pending);
        Ok(())
    }
}
