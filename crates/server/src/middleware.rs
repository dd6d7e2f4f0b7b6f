use axum::{
    extract::{ConnectInfo, Request},
    middleware::Next,
    response::Response,
};
use std::net::SocketAddr;
use std::time::Instant;
use tracing::info;

/// 请求日志中间件
/// 记录每个HTTP请求的IP地址、方法、路径、状态码和耗时
///
/// 未通过 `into_make_service_with_connect_info` 启动时(例如测试)IP 记为 unknown
pub async fn request_logger(
    connect_info: Option<ConnectInfo<SocketAddr>>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    let client_ip = connect_info
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string());

    info!("🌐 请求开始 - IP: {} | {} {}", client_ip, method, uri);

    let response = next.run(request).await;

    let duration = start.elapsed();
    info!(
        "✅ 请求完成 - IP: {} | {} {} | 状态: {} | 耗时: {:.2}ms",
        client_ip,
        method,
        uri,
        response.status().as_u16(),
        duration.as_secs_f64() * 1000.0
    );

    response
}
