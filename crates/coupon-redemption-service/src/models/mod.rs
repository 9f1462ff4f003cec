//! 兑换服务领域模型
//!
//! 包含玩家、奖励、优惠券与兑换记录的实体定义

pub mod coupon;
pub mod player;
pub mod reward;

pub use coupon::{Coupon, CouponView, PlayerCoupon, RedemptionHistoryEntry};
pub use player::Player;
pub use reward::Reward;
