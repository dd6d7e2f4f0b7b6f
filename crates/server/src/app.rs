use crate::{router::AppRouter, services::Services};
use anyhow::Context;
use axum::serve;
use database::{commission_rule::repository::CommissionRuleRepositoryTrait, Database};
use std::{net::SocketAddr, sync::Arc};
use tokio::signal;
use tracing::{error, info};
use utils::AppConfig;

pub struct ApplicationServer;

impl ApplicationServer {
    pub async fn serve(config: Arc<AppConfig>) -> anyhow::Result<()> {
        // 日志已由 referral/src/main.rs 初始化

        let tcp_listener = tokio::net::TcpListener::bind(config.bind_address())
            .await
            .context("🔴 Failed to bind TCP listener")?;

        let local_addr = tcp_listener.local_addr().context("🔴 Failed to get local address")?;

        let db = Self::prepare_database(config.clone()).await?;
        let services = Services::new(db);
        let router = AppRouter::new(services, config.http_timeout_secs);

        info!("🟢 server:referral has launched on {local_addr} 🚀");

        serve(tcp_listener, router.into_make_service_with_connect_info::<SocketAddr>())
            .with_graceful_shutdown(Self::shutdown_signal())
            .await
            .context("🔴 Failed to start server")?;

        Ok(())
    }

    /// 连接数据库、建立索引，按配置写入默认分润规则
    async fn prepare_database(config: Arc<AppConfig>) -> anyhow::Result<Database> {
        let db = Database::new(config.clone())
            .await
            .context("🔴 Failed to connect mongodb")?;

        db.init_indexes().await.context("🔴 Failed to create indexes")?;

        if config.seed_commission_rules {
            db.seed_default_rules()
                .await
                .context("🔴 Failed to seed commission rules")?;
        }

        Ok(db)
    }

    async fn shutdown_signal() {
        let ctrl_c = async {
            if let Err(e) = signal::ctrl_c().await {
                error!("🔴 Failed to install Ctrl+C handler: {}", e);
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let terminate = async {
            match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    sigterm.recv().await;
                }
                Err(e) => {
                    error!("🔴 Failed to install signal handler: {}", e);
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {},
            _ = terminate => {},
        }

        tracing::warn!("❌ Signal received, starting graceful shutdown...");
    }
}
