//! 优惠券兑换服务
//!
//! 玩家用奖励兑换一张优惠券：校验奖励有效期与每日/累计限额，
//! 从奖励的券池中分配一张尚未被领取的券并记录兑换。
//!
//! ## 核心功能
//!
//! - **资格评估**：有效期（闭区间）、每日限额、累计限额，按固定顺序校验
//! - **优惠券分配**：按 id 升序挑选未被领取的券，每张券只会分配一次
//! - **兑换编排**：查找玩家与奖励、评估、分配，全部成功才提交
//!
//! ## 模块结构
//!
//! - `models`: 领域模型定义
//! - `error`: 错误类型定义
//! - `clock`: 时钟与自然日时区
//! - `eligibility`: 资格评估
//! - `allocator`: 优惠券分配
//! - `repository`: 存储契约及 PostgreSQL / 内存实现
//! - `service`: 兑换编排
//! - `api`: HTTP 接口

pub mod allocator;
pub mod api;
pub mod clock;
pub mod eligibility;
pub mod error;
pub mod models;
pub mod repository;
pub mod service;

pub use allocator::CouponAllocator;
pub use api::{AppState, router};
pub use clock::{CalendarZone, Clock, FixedClock, SystemClock};
pub use eligibility::{Denial, Eligibility, EligibilityEvaluator};
pub use error::{RedemptionError, Result};
pub use models::*;
pub use repository::{
    MemoryFixture, MemoryRedemptionStore, PgRedemptionStore, RedemptionStore, RedemptionUnit,
};
pub use service::{RedeemCouponRequest, RedemptionService, RedemptionStage};
