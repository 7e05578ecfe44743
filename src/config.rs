//! 環境変数からのアプリケーション設定

use std::time::Duration;
use thiserror::Error;

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_EXPIRY_SWEEP_SECS: u64 = 3600;

/// 設定値のエラー
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} must be a number, got '{value}'")]
    InvalidNumber { name: &'static str, value: String },

    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

/// アプリケーション設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// 未設定ならメモリ上のストアで起動する
    pub database_url: Option<String>,
    pub port: u16,
    pub db_max_connections: u32,
    /// 取り置き期限切れ処理の実行間隔
    pub expiry_sweep_interval: Duration,
}

impl AppConfig {
    /// DATABASE_URL, PORT, DB_MAX_CONNECTIONS, EXPIRY_SWEEP_SECS を読む
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let database_url = lookup("DATABASE_URL").filter(|url| !url.trim().is_empty());
        let port = parse_number(&lookup, "PORT", DEFAULT_PORT)?;
        let db_max_connections =
            parse_number(&lookup, "DB_MAX_CONNECTIONS", DEFAULT_DB_MAX_CONNECTIONS)?;
        if db_max_connections == 0 {
            return Err(ConfigError::Zero("DB_MAX_CONNECTIONS"));
        }
        let sweep_secs = parse_number(&lookup, "EXPIRY_SWEEP_SECS", DEFAULT_EXPIRY_SWEEP_SECS)?;
        if sweep_secs == 0 {
            return Err(ConfigError::Zero("EXPIRY_SWEEP_SECS"));
        }

        Ok(Self {
            database_url,
            port,
            db_max_connections,
            expiry_sweep_interval: Duration::from_secs(sweep_secs),
        })
    }

    pub fn bind_address(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }
}

fn parse_number<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(name) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidNumber { name, value }),
        None => Ok(default),
    }
}
