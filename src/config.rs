use std::env;

use crate::payment::GatewayConfig;

/// Per-tier rate limits (requests per minute) for public endpoints.
#[derive(Debug, Clone, Copy)]
pub struct RateLimits {
    pub strict_rpm: u32,
    pub standard_rpm: u32,
    pub relaxed_rpm: u32,
}

impl Default for RateLimits {
    fn default() -> Self {
        Self {
            strict_rpm: 10,
            standard_rpm: 30,
            relaxed_rpm: 60,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_path: String,
    pub base_url: String,
    pub gateway: GatewayConfig,
    pub rate_limit: RateLimits,
    pub dev_mode: bool,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let dev_mode = env::var("CARDBASE_ENV")
            .map(|v| v == "dev" || v == "development")
            .unwrap_or(false);

        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port: u16 = env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(3000);

        let base_url =
            env::var("BASE_URL").unwrap_or_else(|_| format!("http://{}:{}", host, port));

        let rate_limit = RateLimits {
            strict_rpm: env_u32("RATE_LIMIT_STRICT_RPM", 10),
            standard_rpm: env_u32("RATE_LIMIT_STANDARD_RPM", 30),
            relaxed_rpm: env_u32("RATE_LIMIT_RELAXED_RPM", 60),
        };

        Self {
            host,
            port,
            database_path: env::var("DATABASE_PATH")
                .unwrap_or_else(|_| "cardbase.db".to_string()),
            base_url,
            gateway: GatewayConfig::from_env(),
            rate_limit,
            dev_mode,
        }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn env_u32(name: &str, default: u32) -> u32 {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
