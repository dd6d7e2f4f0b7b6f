use crate::{
    dtos::{
        commission_dto::{CommissionListResponse, DownlineResponse},
        user_dto::{
            CreateUserDto, MessageResponse, UpdateUserDto, UserListResponse, UserProfileResponse, UserResponse,
        },
    },
    extractors::validation_extractor::ValidationExtractor,
    services::Services,
};
use axum::{extract::Path, http::StatusCode, routing::get, Extension, Json, Router};
use utils::AppResult;

/// 会员列表(最新注册的在前)
#[utoipa::path(
    get,
    path = "/api/v1/users",
    tag = "user",
    responses(
        (status = 200, description = "全部会员及推荐人名称", body = UserListResponse)
    )
)]
pub async fn list_users(Extension(services): Extension<Services>) -> AppResult<Json<UserListResponse>> {
    let users = services.user.list_users().await?;

    Ok(Json(UserListResponse { users }))
}

/// 注册会员
#[utoipa::path(
    post,
    path = "/api/v1/users",
    tag = "user",
    request_body = CreateUserDto,
    responses(
        (status = 201, description = "注册成功", body = UserResponse),
        (status = 400, description = "缺少名称或推荐人不存在"),
        (status = 409, description = "名称已被使用")
    )
)]
pub async fn create_user(
    Extension(services): Extension<Services>,
    ValidationExtractor(req): ValidationExtractor<CreateUserDto>,
) -> AppResult<(StatusCode, Json<UserResponse>)> {
    let user = services
        .user
        .create_user(req.name.as_deref().unwrap_or_default(), req.referrer_id.as_deref())
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(UserResponse {
            user,
            message: "User created successfully".to_string(),
        }),
    ))
}

/// 会员详情
#[utoipa::path(
    get,
    path = "/api/v1/users/{id}",
    tag = "user",
    params(
        ("id" = String, Path, description = "会员ID")
    ),
    responses(
        (status = 200, description = "会员、推荐人名称、累计分润与直接下线数", body = UserProfileResponse),
        (status = 404, description = "会员不存在")
    )
)]
pub async fn get_user(
    Extension(services): Extension<Services>,
    Path(id): Path<String>,
) -> AppResult<Json<UserProfileResponse>> {
    let user = services.user.get_user_profile(&id).await?;

    Ok(Json(UserProfileResponse { user }))
}

/// 修改会员名称或推荐人
#[utoipa::path(
    put,
    path = "/api/v1/users/{id}",
    tag = "user",
    request_body = UpdateUserDto,
    params(
        ("id" = String, Path, description = "会员ID")
    ),
    responses(
        (status = 200, description = "修改成功", body = UserResponse),
        (status = 400, description = "缺少名称、推荐人不存在或推荐人为自己"),
        (status = 404, description = "会员不存在"),
        (status = 409, description = "名称已被使用")
    )
)]
pub async fn update_user(
    Extension(services): Extension<Services>,
    Path(id): Path<String>,
    ValidationExtractor(req): ValidationExtractor<UpdateUserDto>,
) -> AppResult<Json<UserResponse>> {
    let user = services
        .user
        .update_user(&id, req.name.as_deref().unwrap_or_default(), req.referrer_id.as_deref())
        .await?;

    Ok(Json(UserResponse {
        user,
        message: "User updated successfully".to_string(),
    }))
}

/// 删除会员及其中奖与分润记录
#[utoipa::path(
    delete,
    path = "/api/v1/users/{id}",
    tag = "user",
    params(
        ("id" = String, Path, description = "会员ID")
    ),
    responses(
        (status = 200, description = "删除成功", body = MessageResponse),
        (status = 404, description = "会员不存在")
    )
)]
pub async fn delete_user(
    Extension(services): Extension<Services>,
    Path(id): Path<String>,
) -> AppResult<Json<MessageResponse>> {
    services.user.delete_user(&id).await?;

    Ok(Json(MessageResponse {
        message: "User deleted successfully".to_string(),
    }))
}

/// 三代以内的下线
#[utoipa::path(
    get,
    path = "/api/v1/users/{id}/downline",
    tag = "user",
    params(
        ("id" = String, Path, description = "会员ID")
    ),
    responses(
        (status = 200, description = "按代数排列的下线", body = DownlineResponse)
    )
)]
pub async fn get_downline(
    Extension(services): Extension<Services>,
    Path(id): Path<String>,
) -> AppResult<Json<DownlineResponse>> {
    let downline = services.downline.get_downline(&id).await?;

    Ok(Json(DownlineResponse { downline }))
}

/// 会员获得的分润
#[utoipa::path(
    get,
    path = "/api/v1/users/{id}/commissions",
    tag = "user",
    params(
        ("id" = String, Path, description = "会员ID")
    ),
    responses(
        (status = 200, description = "分润记录，最新的在前", body = CommissionListResponse)
    )
)]
pub async fn get_commissions(
    Extension(services): Extension<Services>,
    Path(id): Path<String>,
) -> AppResult<Json<CommissionListResponse>> {
    let commissions = services.commission.list_for_user(&id).await?;

    Ok(Json(CommissionListResponse { commissions }))
}

pub struct UserController;
impl UserController {
    pub fn app() -> Router {
        Router::new()
            .route("/users", get(list_users).post(create_user))
            .route("/users/:id", get(get_user).put(update_user).delete(delete_user))
            .route("/users/:id/downline", get(get_downline))
            .route("/users/:id/commissions", get(get_commissions))
    }
}
