use std::{env, str::FromStr, time::Duration};

use anyhow::Context;

use crate::status_rules::StatusThresholds;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    /// Users loaded and notified per insert during a broadcast.
    pub fanout_page_size: u64,
    /// Open orders loaded per page by the auto-updater.
    pub auto_update_page_size: u64,
    /// Default deadline for admin batch operations.
    pub batch_timeout: Duration,
    pub thresholds: StatusThresholds,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL").context("DATABASE_URL is not set")?;
        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET is not set")?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = parse_or("APP_PORT", 3000u16);

        let thresholds = StatusThresholds::try_from_hours(
            parse_or("ORDER_PENDING_HOURS", 24),
            parse_or("ORDER_PROCESSING_HOURS", 48),
            parse_or("ORDER_SHIPPED_HOURS", 72),
        )?;

        Ok(Self {
            database_url,
            host,
            port,
            jwt_secret,
            fanout_page_size: parse_or("FANOUT_PAGE_SIZE", 500u64).max(1),
            auto_update_page_size: parse_or("AUTO_UPDATE_PAGE_SIZE", 200u64).max(1),
            batch_timeout: Duration::from_millis(parse_or("BATCH_TIMEOUT_MS", 30_000)),
            thresholds,
        })
    }
}

fn parse_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|value| value.parse::<T>().ok())
        .unwrap_or(default)
}
