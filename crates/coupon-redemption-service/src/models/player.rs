//! 玩家实体

use serde::{Deserialize, Serialize};

/// 玩家
///
/// 由外部系统创建，本服务只读
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub id: i32,
    pub name: String,
}
