use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// 会员模型
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct User {
    /// 8 码大小写英数混合会员ID
    pub id: String,
    /// 会员名称(唯一)
    pub name: String,
    /// 推荐人(上线)会员ID
    pub referrer_id: Option<String>,
    /// 创建时间(毫秒时间戳)
    pub created_at: i64,
}

/// 级联删除会员后的统计
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct UserDeletion {
    pub deleted_prizes: u64,
    pub deleted_commissions: u64,
    /// 被解除推荐关系的直接下线数量
    pub detached_referees: u64,
}
