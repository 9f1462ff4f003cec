//! PostgreSQL 兑换存储
//!
//! 每次兑换一个事务：
//! - `set_config('lock_timeout')` 限制锁等待时间
//! - `pg_advisory_xact_lock(player_id, reward_id)` 串行化同一玩家对同一奖励的请求
//! - 选券使用 `FOR UPDATE SKIP LOCKED`，并排除已有兑换记录的券
//! - `player_coupons.coupon_id` 唯一约束兜底，冲突映射为 `AllocationConflict`

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::migrate::Migrator;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::{debug, instrument};

use super::traits::{RedemptionStore, RedemptionUnit};
use crate::error::{RedemptionError, Result};
use crate::models::{Coupon, Player, PlayerCoupon, RedemptionHistoryEntry, Reward};

/// 内嵌的数据库迁移脚本
pub static MIGRATOR: Migrator = sqlx::migrate!();

/// 视为并发冲突的 SQLSTATE
///
/// 23505 unique_violation, 40001 serialization_failure,
/// 40P01 deadlock_detected, 55P03 lock_not_available
const CONFLICT_SQLSTATES: [&str; 4] = ["23505", "40001", "40P01", "55P03"];

/// 将数据库错误中可重试的并发冲突映射为 `AllocationConflict`
fn map_conflict(err: sqlx::Error) -> RedemptionError {
    let is_conflict = err
        .as_database_error()
        .and_then(|db_err| db_err.code())
        .map(|code| CONFLICT_SQLSTATES.contains(&code.as_ref()))
        .unwrap_or(false);

    if is_conflict {
        debug!(error = %err, "Database reported a concurrent allocation conflict");
        RedemptionError::AllocationConflict
    } else {
        RedemptionError::Database(err)
    }
}

/// PostgreSQL 兑换存储
pub struct PgRedemptionStore {
    pool: PgPool,
    lock_timeout: Duration,
}

impl PgRedemptionStore {
    pub fn new(pool: PgPool, lock_timeout: Duration) -> Self {
        Self { pool, lock_timeout }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl RedemptionStore for PgRedemptionStore {
    async fn find_player(&self, id: i32) -> Result<Option<Player>> {
        let player = sqlx::query_as::<_, Player>(
            r#"
            SELECT id, name
            FROM players
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(player)
    }

    async fn find_reward(&self, id: i32) -> Result<Option<Reward>> {
        let reward = sqlx::query_as::<_, Reward>(
            r#"
            SELECT id, name, start_date, end_date, per_day_limit, total_limit
            FROM rewards
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(reward)
    }

    #[instrument(skip(self))]
    async fn begin(&self, player_id: i32, reward_id: i32) -> Result<Box<dyn RedemptionUnit>> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("SELECT set_config('lock_timeout', $1, true)")
            .bind(format!("{}ms", self.lock_timeout.as_millis()))
            .execute(&mut *tx)
            .await?;

        sqlx::query("SELECT 1 FROM pg_advisory_xact_lock($1, $2)")
            .bind(player_id)
            .bind(reward_id)
            .execute(&mut *tx)
            .await
            .map_err(map_conflict)?;

        debug!(player_id, reward_id, "Advisory lock acquired");

        Ok(Box::new(PgRedemptionUnit { tx }))
    }

    async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// 单个兑换事务
///
/// 未调用 `commit` 即被 drop 时，sqlx 会回滚事务并释放 advisory lock。
struct PgRedemptionUnit {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl RedemptionUnit for PgRedemptionUnit {
    async fn load_history(&mut self, player_id: i32) -> Result<Vec<RedemptionHistoryEntry>> {
        let history = sqlx::query_as::<_, RedemptionHistoryEntry>(
            r#"
            SELECT pc.id AS redemption_id, pc.player_id, pc.coupon_id,
                   c.reward_id, pc.redeemed_at
            FROM player_coupons pc
            JOIN coupons c ON c.id = pc.coupon_id
            WHERE pc.player_id = $1
            ORDER BY pc.redeemed_at ASC
            "#,
        )
        .bind(player_id)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(history)
    }

    async fn select_unassigned_coupon(
        &mut self,
        reward_id: i32,
        exclude: &[i32],
    ) -> Result<Option<Coupon>> {
        let coupon = sqlx::query_as::<_, Coupon>(
            r#"
            SELECT c.id, c.reward_id, c.value
            FROM coupons c
            WHERE c.reward_id = $1
              AND c.id <> ALL($2)
              AND NOT EXISTS (
                  SELECT 1 FROM player_coupons pc WHERE pc.coupon_id = c.id
              )
            ORDER BY c.id ASC
            LIMIT 1
            FOR UPDATE OF c SKIP LOCKED
            "#,
        )
        .bind(reward_id)
        .bind(exclude.to_vec())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(map_conflict)?;

        Ok(coupon)
    }

    async fn insert_redemption(
        &mut self,
        player_id: i32,
        coupon_id: i32,
        redeemed_at: DateTime<Utc>,
    ) -> Result<PlayerCoupon> {
        let record = sqlx::query_as::<_, PlayerCoupon>(
            r#"
            INSERT INTO player_coupons (player_id, coupon_id, redeemed_at)
            VALUES ($1, $2, $3)
            RETURNING id, player_id, coupon_id, redeemed_at
            "#,
        )
        .bind(player_id)
        .bind(coupon_id)
        .bind(redeemed_at)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(map_conflict)?;

        Ok(record)
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        self.tx.commit().await.map_err(map_conflict)
    }
}
