use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// 分润记录模型
///
/// 仅在登记中奖时产生，之后不再修改；只会随会员的级联删除一起删除。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Commission {
    pub id: i64,
    /// 获得分润的上线会员ID
    pub user_id: String,
    /// 触发分润的中奖记录
    pub prize_id: i64,
    /// 中奖会员ID(冗余自 Prize，便于查询)
    pub winner_id: String,
    /// 中奖者到获利者之间的代数(1..=3)
    pub level: i32,
    /// 创建时依分润规则快照的金额
    pub amount: i64,
    /// 创建时间(毫秒时间戳)
    pub created_at: i64,
}

/// 待写入的分润，由分润引擎计算后连同中奖记录一起提交
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommissionDraft {
    pub user_id: String,
    pub level: i32,
    pub amount: i64,
}

impl CommissionDraft {
    pub fn into_commission(self, id: i64, prize_id: i64, winner_id: &str, created_at: i64) -> Commission {
        Commission {
            id,
            user_id: self.user_id,
            prize_id,
            winner_id: winner_id.to_string(),
            level: self.level,
            amount: self.amount,
            created_at,
        }
    }
}
