use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Referral Commission API",
        description = "会员推荐与三代分润系统 API 文档",
        version = "1.0.0"
    ),
    paths(
        // System health check
        crate::api::health,
        // User endpoints
        crate::api::user_controller::list_users,
        crate::api::user_controller::create_user,
        crate::api::user_controller::get_user,
        crate::api::user_controller::update_user,
        crate::api::user_controller::delete_user,
        crate::api::user_controller::get_downline,
        crate::api::user_controller::get_commissions,
        // Prize endpoints
        crate::api::prize_controller::register_prize,
        crate::api::prize_controller::list_prizes,
        // Admin endpoints
        crate::api::admin_controller::recent_commissions,
        crate::api::admin_controller::stats,
    ),
    components(
        schemas(
            // Database models
            database::user::model::User,
            database::prize::model::Prize,
            database::prize::model::PrizeName,
            database::commission::model::Commission,
            // DTOs
            crate::dtos::user_dto::CreateUserDto,
            crate::dtos::user_dto::UpdateUserDto,
            crate::dtos::user_dto::UserView,
            crate::dtos::user_dto::UserProfile,
            crate::dtos::user_dto::UserResponse,
            crate::dtos::user_dto::UserListResponse,
            crate::dtos::user_dto::UserProfileResponse,
            crate::dtos::user_dto::MessageResponse,
            crate::dtos::prize_dto::RegisterPrizeDto,
            crate::dtos::prize_dto::RegisterPrizeResponse,
            crate::dtos::prize_dto::PrizeView,
            crate::dtos::prize_dto::PrizeListResponse,
            crate::dtos::commission_dto::CommissionView,
            crate::dtos::commission_dto::CommissionListResponse,
            crate::dtos::commission_dto::DownlineEntry,
            crate::dtos::commission_dto::DownlineResponse,
            crate::dtos::commission_dto::Stats,
            crate::dtos::commission_dto::StatsResponse,
        )
    ),
    tags(
        (name = "系统状态", description = "健康检查"),
        (name = "user", description = "会员注册、资料、下线与分润"),
        (name = "prize", description = "中奖登记与分润发放"),
        (name = "admin", description = "后台分润列表与统计")
    )
)]
pub struct ApiDoc;
