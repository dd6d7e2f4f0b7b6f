use database::{commission::model::Commission, prize::model::Prize};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

/// 登记中奖请求
#[derive(Clone, Serialize, Deserialize, Debug, Validate, Default, ToSchema)]
pub struct RegisterPrizeDto {
    #[validate(
        required(message = "Winner ID and prize name are required"),
        length(min = 1, message = "Winner ID and prize name are required")
    )]
    pub winner_id: Option<String>,
    /// 組合A 或 組合B
    #[validate(
        required(message = "Winner ID and prize name are required"),
        length(min = 1, message = "Winner ID and prize name are required")
    )]
    pub prize_name: Option<String>,
}

/// 登记中奖的结果: 中奖记录与按代数升序排列的分润
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, ToSchema)]
pub struct PrizeRegistration {
    pub prize: Prize,
    pub commissions: Vec<Commission>,
}

#[derive(Clone, Serialize, Deserialize, Debug, ToSchema)]
pub struct RegisterPrizeResponse {
    pub prize: Prize,
    pub commissions: Vec<Commission>,
    pub message: String,
}

impl From<PrizeRegistration> for RegisterPrizeResponse {
    fn from(registration: PrizeRegistration) -> Self {
        let message = format!(
            "中獎登記成功！已為 {} 位上線建立分潤",
            registration.commissions.len()
        );
        Self {
            prize: registration.prize,
            commissions: registration.commissions,
            message,
        }
    }
}

/// 中奖记录 + 中奖者名称
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, ToSchema)]
pub struct PrizeView {
    #[serde(flatten)]
    pub prize: Prize,
    pub winner_name: Option<String>,
}

#[derive(Clone, Serialize, Deserialize, Debug, ToSchema)]
pub struct PrizeListResponse {
    pub prizes: Vec<PrizeView>,
}
