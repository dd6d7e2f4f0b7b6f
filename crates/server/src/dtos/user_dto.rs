use database::user::model::User;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

/// 注册会员请求
#[derive(Clone, Serialize, Deserialize, Debug, Validate, Default, ToSchema)]
pub struct CreateUserDto {
    #[validate(required(message = "Name is required"), length(min = 1, message = "Name is required"))]
    pub name: Option<String>,
    /// 推荐人会员ID，空字符串视为无推荐人
    pub referrer_id: Option<String>,
}

/// 更新会员请求
#[derive(Clone, Serialize, Deserialize, Debug, Validate, Default, ToSchema)]
pub struct UpdateUserDto {
    #[validate(required(message = "Name is required"), length(min = 1, message = "Name is required"))]
    pub name: Option<String>,
    pub referrer_id: Option<String>,
}

/// 会员 + 推荐人名称
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, ToSchema)]
pub struct UserView {
    #[serde(flatten)]
    pub user: User,
    pub referrer_name: Option<String>,
}

/// 会员详情(个人看板)
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, ToSchema)]
pub struct UserProfile {
    #[serde(flatten)]
    pub user: User,
    pub referrer_name: Option<String>,
    /// 累计分润
    pub total_commission: i64,
    /// 直接下线数量
    pub downline_count: u64,
}

#[derive(Clone, Serialize, Deserialize, Debug, ToSchema)]
pub struct UserResponse {
    pub user: User,
    pub message: String,
}

#[derive(Clone, Serialize, Deserialize, Debug, ToSchema)]
pub struct UserListResponse {
    pub users: Vec<UserView>,
}

#[derive(Clone, Serialize, Deserialize, Debug, ToSchema)]
pub struct UserProfileResponse {
    pub user: UserProfile,
}

#[derive(Clone, Serialize, Deserialize, Debug, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}
