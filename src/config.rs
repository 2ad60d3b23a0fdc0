use crate::error::{ApiError, Result};
use clap::Parser;
use reqwest::Url;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8002";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Parser, Debug, Clone)]
#[command(name = "shop-admin")]
#[command(about = "Desktop admin panel for the shop REST API", long_about = None)]
#[command(version)]
pub struct Config {
    /// Base URL of the REST API; every request is made relative to it.
    #[arg(long, env = "SHOP_ADMIN_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Transport timeout for a single request.
    #[arg(long, env = "SHOP_ADMIN_TIMEOUT_SECS", default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout_secs: u64,

    /// Log filter used when RUST_LOG is not set (e.g. "debug", "shop_admin=trace").
    #[arg(long, env = "SHOP_ADMIN_LOG", default_value = "info")]
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Parsed base URL, always ending in `/` so relative joins keep any path prefix.
    pub fn base(&self) -> Result<Url> {
        let trimmed = self.base_url.trim().trim_end_matches('/');
        if trimmed.is_empty() {
            return Err(ApiError::Config("base URL is empty".into()));
        }
        let url = Url::parse(&format!("{trimmed}/"))
            .map_err(|e| ApiError::Config(format!("invalid base URL {trimmed:?}: {e}")))?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(ApiError::Config(format!(
                "unsupported URL scheme {other:?} in {trimmed:?}"
            ))),
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.base()?;
        if self.timeout_secs == 0 {
            return Err(ApiError::Config("timeout must be at least one second".into()));
        }
        Ok(())
    }

    /// Filter directive for tracing-subscriber. Bare levels apply to this crate only.
    pub fn log_directive(&self) -> String {
        let level = self.log_level.trim();
        if level.contains('=') || level.contains(',') {
            level.to_string()
        } else {
            format!("shop_admin={level}")
        }
    }
}
