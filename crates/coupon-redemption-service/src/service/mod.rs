//! 服务层
//!
//! 编排一次兑换：查找玩家与奖励、在兑换单元内评估资格并分配优惠券。
//!
//! ## 模块结构
//!
//! - `dto`: 请求对象定义
//! - `redemption_service`: 兑换编排

pub mod dto;
pub mod redemption_service;

pub use dto::RedeemCouponRequest;
pub use redemption_service::{RedemptionService, RedemptionStage};
