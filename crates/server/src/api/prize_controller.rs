use crate::{
    dtos::prize_dto::{PrizeListResponse, RegisterPrizeDto, RegisterPrizeResponse},
    extractors::validation_extractor::ValidationExtractor,
    services::Services,
};
use axum::{http::StatusCode, routing::get, Extension, Json, Router};
use utils::AppResult;

/// 登记中奖
///
/// 为中奖者往上最多三代的推荐人按当前规则建立分润，中奖记录与分润一起提交
#[utoipa::path(
    post,
    path = "/api/v1/prizes",
    tag = "prize",
    request_body = RegisterPrizeDto,
    responses(
        (status = 201, description = "中奖登记成功", body = RegisterPrizeResponse),
        (status = 400, description = "缺少字段或奖项名称无效"),
        (status = 404, description = "中奖会员不存在")
    )
)]
pub async fn register_prize(
    Extension(services): Extension<Services>,
    ValidationExtractor(req): ValidationExtractor<RegisterPrizeDto>,
) -> AppResult<(StatusCode, Json<RegisterPrizeResponse>)> {
    let registration = services
        .prize
        .register_prize(
            req.winner_id.as_deref().unwrap_or_default(),
            req.prize_name.as_deref().unwrap_or_default(),
        )
        .await?;

    Ok((StatusCode::CREATED, Json(registration.into())))
}

/// 中奖记录列表(最新的在前)
#[utoipa::path(
    get,
    path = "/api/v1/prizes",
    tag = "prize",
    responses(
        (status = 200, description = "中奖记录", body = PrizeListResponse)
    )
)]
pub async fn list_prizes(Extension(services): Extension<Services>) -> AppResult<Json<PrizeListResponse>> {
    let prizes = services.prize.list_prizes().await?;

    Ok(Json(PrizeListResponse { prizes }))
}

pub struct PrizeController;
impl PrizeController {
    pub fn app() -> Router {
        Router::new().route("/prizes", get(list_prizes).post(register_prize))
    }
}
