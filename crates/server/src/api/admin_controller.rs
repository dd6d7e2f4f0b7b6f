use crate::{
    dtos::commission_dto::{CommissionListResponse, RecentCommissionsQuery, StatsResponse},
    services::Services,
};
use axum::{
    extract::{rejection::QueryRejection, Query},
    routing::get,
    Extension, Json, Router,
};
use utils::AppResult;

/// 最近的分润记录
#[utoipa::path(
    get,
    path = "/api/v1/admin/commissions",
    tag = "admin",
    params(RecentCommissionsQuery),
    responses(
        (status = 200, description = "最近的分润，最新的在前", body = CommissionListResponse),
        (status = 400, description = "limit 必须为正整数")
    )
)]
pub async fn recent_commissions(
    Extension(services): Extension<Services>,
    query: Result<Query<RecentCommissionsQuery>, QueryRejection>,
) -> AppResult<Json<CommissionListResponse>> {
    let Query(query) = query?;
    let commissions = services.commission.list_recent(query.limit).await?;

    Ok(Json(CommissionListResponse { commissions }))
}

/// 会员与分润统计
#[utoipa::path(
    get,
    path = "/api/v1/admin/stats",
    tag = "admin",
    responses(
        (status = 200, description = "总数与当日(UTC)新增", body = StatsResponse)
    )
)]
pub async fn stats(Extension(services): Extension<Services>) -> AppResult<Json<StatsResponse>> {
    let stats = services.commission.stats().await?;

    Ok(Json(StatsResponse { stats }))
}

pub struct AdminController;
impl AdminController {
    pub fn app() -> Router {
        Router::new()
            .route("/commissions", get(recent_commissions))
            .route("/stats", get(stats))
    }
}
