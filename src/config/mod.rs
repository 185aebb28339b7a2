//! Configuration module for the GameHub backend.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

pub const DEFAULT_PRICE_API_URL: &str = "https://api.dexscreener.com/latest/dex/search";

#[derive(Debug, Error)]
#[error("invalid value for {var}: {value:?}")]
pub struct ConfigError {
    pub var: &'static str,
    pub value: String,
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Pre-shared key for the admin routes (required in production)
    pub admin_psk: Option<String>,
    /// Path to SQLite database file
    pub db_path: PathBuf,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Telegram bot token used to verify init data; unverified when unset
    pub bot_token: Option<String>,
    pub price_api_url: String,
    /// Search term sent to the price API
    pub price_query: String,
    pub price_timeout: Duration,
    pub autosave_interval: Duration,
    /// RUB rate prefilled in the token form while no snapshot exists
    pub default_usd_to_rub_rate: f64,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let admin_psk = non_empty("GAMEHUB_ADMIN_PSK");

        let db_path = env::var("GAMEHUB_DB_PATH")
            .unwrap_or_else(|_| "./data/gamehub.sqlite".to_string())
            .into();

        let bind_addr = parse_var("GAMEHUB_BIND_ADDR", "127.0.0.1:8080")?;

        let log_level = env::var("GAMEHUB_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let bot_token = non_empty("GAMEHUB_BOT_TOKEN");

        let price_api_url =
            env::var("GAMEHUB_PRICE_API_URL").unwrap_or_else(|_| DEFAULT_PRICE_API_URL.to_string());
        let price_query = env::var("GAMEHUB_PRICE_QUERY").unwrap_or_else(|_| "GHUB".to_string());
        let price_timeout = Duration::from_secs(parse_var("GAMEHUB_PRICE_TIMEOUT_SECS", "10")?);
        let autosave_interval =
            Duration::from_secs(parse_var("GAMEHUB_AUTOSAVE_INTERVAL_SECS", "30")?);
        let default_usd_to_rub_rate = parse_var("GAMEHUB_DEFAULT_USD_TO_RUB_RATE", "95.0")?;

        Ok(Self {
            admin_psk,
            db_path,
            bind_addr,
            log_level,
            bot_token,
            price_api_url,
            price_query,
            price_timeout,
            autosave_interval,
            default_usd_to_rub_rate,
        })
    }
}

fn non_empty(var: &str) -> Option<String> {
    env::var(var).ok().filter(|v| !v.trim().is_empty())
}

fn parse_var<T: std::str::FromStr>(var: &'static str, default: &str) -> Result<T, ConfigError> {
    let value = env::var(var).unwrap_or_else(|_| default.to_string());
    value.trim().parse().map_err(|_| ConfigError { var, value })
}
