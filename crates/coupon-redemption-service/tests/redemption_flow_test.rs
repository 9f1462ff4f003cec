//! 兑换流程集成测试
//!
//! 使用内存存储和固定时钟走完整的兑换流程，覆盖限额、有效期和并发分配。

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, TimeZone, Utc};
use coupon_redemption::{
    CalendarZone, Coupon, EligibilityEvaluator, FixedClock, MemoryFixture, MemoryRedemptionStore,
    Player, RedeemCouponRequest, RedemptionError, RedemptionService, Reward,
};

// ==================== 辅助函数 ====================

fn noon() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap()
}

fn player(id: i32) -> Player {
    Player {
        id,
        name: format!("Player {}", id),
    }
}

fn reward(id: i32, per_day_limit: i32, total_limit: i32) -> Reward {
    Reward {
        id,
        name: format!("Reward {}", id),
        start_date: noon() - Duration::days(1),
        end_date: noon() + Duration::days(7),
        per_day_limit,
        total_limit,
    }
}

fn coupons(reward_id: i32, ids: impl IntoIterator<Item = i32>) -> Vec<Coupon> {
    ids.into_iter()
        .map(|id| Coupon {
            id,
            reward_id,
            value: format!("Coupon {}", id),
        })
        .collect()
}

struct Harness {
    store: Arc<MemoryRedemptionStore>,
    clock: Arc<FixedClock>,
    service: Arc<RedemptionService>,
}

fn harness(fixture: MemoryFixture) -> Harness {
    let store = Arc::new(MemoryRedemptionStore::from_fixture(
        fixture,
        StdDuration::from_secs(5),
    ));
    let clock = Arc::new(FixedClock::new(noon()));
    let service = Arc::new(RedemptionService::new(
        store.clone(),
        EligibilityEvaluator::new(CalendarZone::Utc),
        clock.clone(),
    ));

    Harness {
        store,
        clock,
        service,
    }
}

// ==================== 单请求流程 ====================

#[tokio::test]
async fn test_first_redemption_succeeds_second_hits_per_day_limit() {
    let h = harness(MemoryFixture {
        players: vec![player(20)],
        rewards: vec![reward(21, 1, 1)],
        coupons: coupons(21, [20, 21]),
        redemptions: vec![],
    });

    let coupon = h
        .service
        .redeem(RedeemCouponRequest::new(20, 21))
        .await
        .unwrap();
    assert!([20, 21].contains(&coupon.id));
    assert_eq!(coupon.value, format!("Coupon {}", coupon.id));

    let err = h
        .service
        .redeem(RedeemCouponRequest::new(20, 21))
        .await
        .unwrap_err();
    // perDayLimit 与 totalLimit 同为 1 时先命中每日限额
    assert!(matches!(err, RedemptionError::PerDayLimitExceeded { .. }));

    let redemptions = h.store.redemptions().await;
    assert_eq!(redemptions.len(), 1);
    assert_eq!(redemptions[0].player_id, 20);
    assert_eq!(redemptions[0].coupon_id, coupon.id);
    assert_eq!(redemptions[0].redeemed_at, noon());
}

#[tokio::test]
async fn test_total_limit_denies_on_following_day() {
    let h = harness(MemoryFixture {
        players: vec![player(20)],
        rewards: vec![reward(21, 1, 1)],
        coupons: coupons(21, [20, 21]),
        redemptions: vec![],
    });

    h.service
        .redeem(RedeemCouponRequest::new(20, 21))
        .await
        .unwrap();

    h.clock.advance(Duration::days(1));
    let err = h
        .service
        .redeem(RedeemCouponRequest::new(20, 21))
        .await
        .unwrap_err();

    assert!(matches!(err, RedemptionError::TotalLimitExceeded { limit: 1, .. }));
    assert_eq!(err.to_string(), "Player has exceeded the total limit");
}

#[tokio::test]
async fn test_lowest_coupon_id_is_allocated_first() {
    let h = harness(MemoryFixture {
        players: vec![player(1), player(2)],
        rewards: vec![reward(21, 5, 5)],
        coupons: coupons(21, [42, 7, 19]),
        redemptions: vec![],
    });

    let first = h.service.redeem(RedeemCouponRequest::new(1, 21)).await.unwrap();
    let second = h.service.redeem(RedeemCouponRequest::new(2, 21)).await.unwrap();
    let third = h.service.redeem(RedeemCouponRequest::new(1, 21)).await.unwrap();

    assert_eq!((first.id, second.id, third.id), (7, 19, 42));
}

#[tokio::test]
async fn test_per_day_limit_resets_next_day() {
    let h = harness(MemoryFixture {
        players: vec![player(20)],
        rewards: vec![reward(21, 2, 10)],
        coupons: coupons(21, 1..=5),
        redemptions: vec![],
    });

    for _ in 0..2 {
        h.service
            .redeem(RedeemCouponRequest::new(20, 21))
            .await
            .unwrap();
    }

    let err = h
        .service
        .redeem(RedeemCouponRequest::new(20, 21))
        .await
        .unwrap_err();
    assert!(matches!(err, RedemptionError::PerDayLimitExceeded { limit: 2, .. }));
    assert_eq!(h.store.redemptions().await.len(), 2);

    h.clock.advance(Duration::days(1));
    let coupon = h
        .service
        .redeem(RedeemCouponRequest::new(20, 21))
        .await
        .unwrap();
    assert_eq!(coupon.id, 3);
}

#[tokio::test]
async fn test_zero_total_limit_always_denies() {
    let h = harness(MemoryFixture {
        players: vec![player(20)],
        rewards: vec![reward(20, 1, 0)],
        coupons: coupons(20, [1]),
        redemptions: vec![],
    });

    let err = h
        .service
        .redeem(RedeemCouponRequest::new(20, 20))
        .await
        .unwrap_err();

    assert!(matches!(err, RedemptionError::TotalLimitExceeded { limit: 0, .. }));
    assert!(h.store.redemptions().await.is_empty());
}

#[tokio::test]
async fn test_reward_starting_in_two_days_is_not_valid() {
    let mut future_reward = reward(22, 1, 1);
    future_reward.start_date = noon() + Duration::days(2);

    let h = harness(MemoryFixture {
        players: vec![player(20)],
        rewards: vec![future_reward],
        coupons: coupons(22, [22]),
        redemptions: vec![],
    });

    let err = h
        .service
        .redeem(RedeemCouponRequest::new(20, 22))
        .await
        .unwrap_err();

    assert!(matches!(err, RedemptionError::RewardNotValid(22)));
    assert_eq!(err.to_string(), "Reward is not valid at the moment");
}

#[tokio::test]
async fn test_unknown_player_and_reward_mutate_nothing() {
    let h = harness(MemoryFixture {
        players: vec![player(20)],
        rewards: vec![reward(21, 1, 1)],
        coupons: coupons(21, [20]),
        redemptions: vec![],
    });

    let err = h
        .service
        .redeem(RedeemCouponRequest::new(999, 21))
        .await
        .unwrap_err();
    assert!(matches!(err, RedemptionError::PlayerNotFound(999)));

    let err = h
        .service
        .redeem(RedeemCouponRequest::new(20, 999))
        .await
        .unwrap_err();
    assert!(matches!(err, RedemptionError::RewardNotFound(999)));

    assert!(h.store.redemptions().await.is_empty());
}

#[tokio::test]
async fn test_exhausted_pool_returns_coupon_not_found() {
    let h = harness(MemoryFixture {
        players: vec![player(1), player(2)],
        rewards: vec![reward(21, 1, 1)],
        coupons: coupons(21, [20]),
        redemptions: vec![],
    });

    h.service.redeem(RedeemCouponRequest::new(1, 21)).await.unwrap();
    let err = h
        .service
        .redeem(RedeemCouponRequest::new(2, 21))
        .await
        .unwrap_err();

    assert!(matches!(err, RedemptionError::CouponNotFound(21)));
    assert_eq!(err.to_string(), "Coupon is not found");
    assert_eq!(h.store.redemptions().await.len(), 1);
}

#[tokio::test]
async fn test_history_of_other_rewards_does_not_count() {
    let h = harness(MemoryFixture {
        players: vec![player(20)],
        rewards: vec![reward(21, 1, 1), reward(23, 1, 1)],
        coupons: [coupons(21, [1]), coupons(23, [2])].concat(),
        redemptions: vec![],
    });

    h.service.redeem(RedeemCouponRequest::new(20, 21)).await.unwrap();
    let coupon = h.service.redeem(RedeemCouponRequest::new(20, 23)).await.unwrap();

    assert_eq!(coupon.id, 2);
}

// ==================== 并发 ====================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_players_never_share_a_coupon() {
    const COUPONS: i32 = 5;
    const PLAYERS: i32 = 20;

    let h = harness(MemoryFixture {
        players: (1..=PLAYERS).map(player).collect(),
        rewards: vec![reward(21, 10, 10)],
        coupons: coupons(21, 1..=COUPONS),
        redemptions: vec![],
    });

    let handles: Vec<_> = (1..=PLAYERS)
        .map(|player_id| {
            let service = h.service.clone();
            tokio::spawn(async move { service.redeem(RedeemCouponRequest::new(player_id, 21)).await })
        })
        .collect();

    let results: Vec<_> = futures::future::join_all(handles)
        .await
        .into_iter()
        .map(|joined| joined.unwrap())
        .collect();

    let won: Vec<i32> = results
        .iter()
        .filter_map(|r| r.as_ref().ok().map(|c| c.id))
        .collect();
    assert_eq!(won.len(), COUPONS as usize);
    assert_eq!(won.iter().collect::<HashSet<_>>().len(), COUPONS as usize);

    for err in results.iter().filter_map(|r| r.as_ref().err()) {
        assert!(
            matches!(
                err,
                RedemptionError::CouponNotFound(_) | RedemptionError::AllocationConflict
            ),
            "unexpected error: {err}"
        );
    }

    let redemptions = h.store.redemptions().await;
    assert_eq!(redemptions.len(), COUPONS as usize);
    let assigned: HashSet<i32> = redemptions.iter().map(|r| r.coupon_id).collect();
    assert_eq!(assigned.len(), COUPONS as usize);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_double_submit_respects_total_limit() {
    let h = harness(MemoryFixture {
        players: vec![player(20)],
        rewards: vec![reward(21, 5, 1)],
        coupons: coupons(21, 1..=5),
        redemptions: vec![],
    });

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let service = h.service.clone();
            tokio::spawn(async move { service.redeem(RedeemCouponRequest::new(20, 21)).await })
        })
        .collect();

    let results: Vec<_> = futures::future::join_all(handles)
        .await
        .into_iter()
        .map(|joined| joined.unwrap())
        .collect();

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    for err in results.iter().filter_map(|r| r.as_ref().err()) {
        assert!(
            matches!(
                err,
                RedemptionError::TotalLimitExceeded { .. } | RedemptionError::AllocationConflict
            ),
            "unexpected error: {err}"
        );
    }
    assert_eq!(h.store.redemptions().await.len(), 1);
}
