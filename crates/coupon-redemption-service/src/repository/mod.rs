//! 数据库仓储层
//!
//! 定义兑换所需的存储契约，并提供 PostgreSQL 与内存两种实现。
//!
//! ## 设计原则
//!
//! - 仓储只负责数据持久化，不包含资格判定
//! - 一次兑换的读写在同一个 `RedemptionUnit` 内完成，由存储保证原子性与串行化
//! - 定义 trait 接口以支持 mock 测试

mod memory_store;
mod pg_store;
mod traits;

pub use memory_store::{MemoryFixture, MemoryRedemptionStore};
pub use pg_store::{MIGRATOR, PgRedemptionStore};
pub use traits::*;
