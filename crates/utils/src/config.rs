#[derive(clap::ValueEnum, Clone, Debug, Copy, PartialEq)]
#[clap(rename_all = "lowercase")]
pub enum CargoEnv {
    Development,
    Production,
}

/// 环境配置加载器
pub struct EnvLoader;

impl EnvLoader {
    /// 根据 CARGO_ENV 加载对应的环境配置文件
    pub fn load_env_file() -> Result<(), Box<dyn std::error::Error>> {
        // 1. 获取环境变量 CARGO_ENV, 默认 development
        let cargo_env = std::env::var("CARGO_ENV").unwrap_or_else(|_| "development".to_string());

        // 2. 构建配置文件路径
        let env_file = Self::env_file_for(&cargo_env);

        // 3. 检查文件是否存在
        if !std::path::Path::new(env_file).exists() {
            eprintln!("⚠️  配置文件 {} 不存在，尝试加载默认的 .env 文件", env_file);
            if std::path::Path::new(".env").exists() {
                dotenvy::from_filename(".env")?;
                println!("✅ 已加载默认配置文件: .env");
            } else {
                eprintln!("❌ 未找到任何配置文件，使用默认配置");
            }
            return Ok(());
        }

        // 4. 加载指定的环境配置文件
        dotenvy::from_filename(env_file)?;
        println!("✅ 已加载环境配置文件: {} (CARGO_ENV={})", env_file, cargo_env);

        Ok(())
    }

    fn env_file_for(cargo_env: &str) -> &'static str {
        match cargo_env {
            "production" | "Production" | "prod" => ".env.production",
            "development" | "Development" | "dev" => ".env.development",
            "test" | "Test" => ".env.test",
            _ => {
                println!("⚠️  未知的 CARGO_ENV: {}，使用默认的 .env.development", cargo_env);
                ".env.development"
            }
        }
    }
}

#[derive(clap::Parser, Clone, Debug)]
pub struct AppConfig {
    #[clap(long, env, value_enum)]
    pub cargo_env: CargoEnv,

    #[clap(long, env, default_value = "0.0.0.0")]
    pub app_host: String,

    #[clap(long, env, default_value = "8000")]
    pub app_port: u16,

    #[clap(long, env, default_value = "mongodb://localhost:27017")]
    pub mongo_uri: String,

    #[clap(long, env)]
    pub mongo_db: String,

    #[clap(long, env, default_value = "info")]
    pub rust_log: String,

    /// 生产环境日志目录
    #[clap(long, env)]
    pub log_dir: Option<String>,

    /// 单个HTTP请求的超时时间(秒)
    #[clap(long, env, default_value = "30")]
    pub http_timeout_secs: u64,

    /// 启动时若分润规则为空，则写入默认的三代分润规则
    #[clap(long, env, default_value = "true", action = clap::ArgAction::Set)]
    pub seed_commission_rules: bool,
}

impl AppConfig {
    /// 手动创建配置实例（用于测试）
    pub fn new_for_test() -> Self {
        Self {
            cargo_env: CargoEnv::Development,
            app_host: "127.0.0.1".to_string(),
            app_port: 8765,
            mongo_uri: std::env::var("MONGO_URI").unwrap_or_else(|_| "mongodb://localhost:27017".to_string()),
            mongo_db: std::env::var("MONGO_DB").unwrap_or_else(|_| "referral_test".to_string()),
            rust_log: "info".to_string(),
            log_dir: None,
            http_timeout_secs: 30,
            seed_commission_rules: true,
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.app_host, self.app_port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_parse_from_args() {
        let config = AppConfig::try_parse_from([
            "referral",
            "--cargo-env",
            "production",
            "--mongo-db",
            "referral",
            "--app-port",
            "9000",
            "--seed-commission-rules",
            "false",
        ])
        .unwrap();

        assert_eq!(config.cargo_env, CargoEnv::Production);
        assert_eq!(config.app_port, 9000);
        assert_eq!(config.http_timeout_secs, 30);
        assert!(!config.seed_commission_rules);
        assert_eq!(config.bind_address(), "0.0.0.0:9000");
    }

    #[test]
    fn test_env_file_selection() {
        assert_eq!(EnvLoader::env_file_for("prod"), ".env.production");
        assert_eq!(EnvLoader::env_file_for("Development"), ".env.development");
        assert_eq!(EnvLoader::env_file_for("test"), ".env.test");
        assert_eq!(EnvLoader::env_file_for("staging"), ".env.development");
    }
}
