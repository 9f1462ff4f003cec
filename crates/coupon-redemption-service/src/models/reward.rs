//! 奖励活动实体

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 奖励活动
///
/// 定义有效期、每日限额与总限额，以及一组归属于它的优惠券
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Reward {
    pub id: i32,
    pub name: String,
    /// 生效开始时间（含）
    pub start_date: DateTime<Utc>,
    /// 生效结束时间（含）
    pub end_date: DateTime<Utc>,
    /// 单个玩家每个自然日最多兑换次数
    pub per_day_limit: i32,
    /// 单个玩家累计最多兑换次数
    pub total_limit: i32,
}

impl Reward {
    /// 检查给定时刻是否落在闭区间 [start_date, end_date] 内
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.start_date && now <= self.end_date
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn reward(start: DateTime<Utc>, end: DateTime<Utc>) -> Reward {
        Reward {
            id: 1,
            name: "测试奖励".to_string(),
            start_date: start,
            end_date: end,
            per_day_limit: 1,
            total_limit: 1,
        }
    }

    #[test]
    fn test_window_is_inclusive() {
        let now = Utc::now();
        let r = reward(now, now + Duration::hours(1));
        assert!(r.is_active_at(now));
        assert!(r.is_active_at(now + Duration::hours(1)));
        assert!(!r.is_active_at(now - Duration::milliseconds(1)));
        assert!(!r.is_active_at(now + Duration::hours(1) + Duration::milliseconds(1)));
    }

    #[test]
    fn test_reward_serialization() {
        let now = Utc::now();
        let json = serde_json::to_value(reward(now, now)).unwrap();
        assert_eq!(json["perDayLimit"], 1);
        assert_eq!(json["totalLimit"], 1);
        assert!(json["startDate"].is_string());
    }
}
