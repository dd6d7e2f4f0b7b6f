use database::{commission::model::Commission, prize::model::PrizeName, user::model::User};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// 分润记录 + 关联名称
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, ToSchema)]
pub struct CommissionView {
    #[serde(flatten)]
    pub commission: Commission,
    /// 获得分润的会员名称
    pub user_name: Option<String>,
    pub winner_name: Option<String>,
    pub prize_name: Option<PrizeName>,
}

#[derive(Clone, Serialize, Deserialize, Debug, ToSchema)]
pub struct CommissionListResponse {
    pub commissions: Vec<CommissionView>,
}

#[derive(Clone, Serialize, Deserialize, Debug, Default, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RecentCommissionsQuery {
    /// 返回条数，默认50，最多500
    pub limit: Option<i64>,
}

/// 下线(三代以内)
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, ToSchema)]
pub struct DownlineEntry {
    pub id: String,
    pub name: String,
    pub created_at: i64,
    /// 第几代下线(1..=3)
    pub level: i32,
}

impl DownlineEntry {
    pub fn from_user(user: User, level: i32) -> Self {
        Self {
            id: user.id,
            name: user.name,
            created_at: user.created_at,
            level,
        }
    }
}

#[derive(Clone, Serialize, Deserialize, Debug, ToSchema)]
pub struct DownlineResponse {
    pub downline: Vec<DownlineEntry>,
}

/// 后台统计
#[derive(Clone, Serialize, Deserialize, Debug, Default, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub total_users: u64,
    pub total_commissions: i64,
    pub today_users: u64,
    pub today_commissions: i64,
}

#[derive(Clone, Serialize, Deserialize, Debug, ToSchema)]
pub struct StatsResponse {
    pub stats: Stats,
}
