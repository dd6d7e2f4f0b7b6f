use super::services::Services;
use crate::{api, docs::ApiDoc, middleware::request_logger};
use axum::{
    error_handling::HandleErrorLayer,
    http::{Method, StatusCode},
    middleware as axum_middleware,
    response::IntoResponse,
    routing::get,
    BoxError, Extension, Json, Router,
};
use lazy_static::lazy_static;
use serde_json::json;
use std::time::Duration;
use tower::{buffer::BufferLayer, ServiceBuilder};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

lazy_static! {
    static ref OPENAPI: utoipa::openapi::OpenApi = ApiDoc::openapi();
}

/// 未配置时的请求超时(秒)
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

pub struct AppRouter;

impl AppRouter {
    pub fn new(services: Services, timeout_secs: u64) -> Router {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::DELETE,
                Method::PUT,
                Method::OPTIONS,
            ])
            .allow_headers([axum::http::header::CONTENT_TYPE, axum::http::header::ACCEPT]);

        Router::new()
            // API 路由
            .nest("/api/v1", api::app())
            // 嵌套路由只匹配 /api/v1，带斜杠的健康检查单独注册
            .route("/api/v1/", get(api::health))
            // API 文档说明页面
            .route("/api-docs", get(api_docs_info))
            .layer(axum_middleware::from_fn(request_logger))
            .layer(cors)
            .layer(
                ServiceBuilder::new()
                    .layer(Extension(services))
                    .layer(TraceLayer::new_for_http())
                    .layer(HandleErrorLayer::new(move |err: BoxError| {
                        Self::handle_timeout_error(err, timeout_secs)
                    }))
                    .timeout(Duration::from_secs(timeout_secs))
                    .layer(BufferLayer::new(1024)),
            )
            // Swagger UI 路由 - 包含 OpenAPI JSON 端点
            .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", OPENAPI.clone()))
            .fallback(Self::handle_404)
    }

    async fn handle_404() -> impl IntoResponse {
        (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "The requested resource does not exist on this server!" })),
        )
    }

    async fn handle_timeout_error(err: BoxError, timeout_secs: u64) -> (StatusCode, Json<serde_json::Value>) {
        if err.is::<tower::timeout::error::Elapsed>() {
            (
                StatusCode::REQUEST_TIMEOUT,
                Json(json!({
                    "error": format!("Request took longer than the configured {} second timeout", timeout_secs)
                })),
            )
        } else {
            tracing::error!("❌ 未处理的内部错误: {}", err);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Internal server error, please retry later." })),
            )
        }
    }
}

/// API 文档说明页面
async fn api_docs_info() -> impl IntoResponse {
    Json(json!({
        "message": "Referral Commission API Documentation",
        "version": OPENAPI.info.version,
        "openapi_spec": "/api-docs/openapi.json",
        "swagger_ui": "/swagger-ui",
        "description": "访问 /swagger-ui 查看交互式 API 文档"
    }))
}
