use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://scorecard.db?mode=rwc";
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";
pub const DEFAULT_PERSIST_TIMEOUT_MS: u64 = 5_000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} is invalid: {reason}")]
    Invalid { name: &'static str, reason: String },
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    pub persist_timeout: Duration,
    pub courses_file: Option<PathBuf>,
}

impl AppConfig {
    /// Reads configuration from the process environment (after `.env`, if
    /// present, has been loaded).
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url =
            lookup("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());

        let bind_addr = lookup("BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::Invalid {
                name: "BIND_ADDR",
                reason: e.to_string(),
            })?;

        let persist_timeout_ms = match lookup("PERSIST_TIMEOUT_MS") {
            Some(raw) => raw.parse::<u64>().map_err(|e| ConfigError::Invalid {
                name: "PERSIST_TIMEOUT_MS",
                reason: e.to_string(),
            })?,
            None => DEFAULT_PERSIST_TIMEOUT_MS,
        };
        if persist_timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                name: "PERSIST_TIMEOUT_MS",
                reason: "must be greater than zero".to_string(),
            });
        }

        let courses_file = lookup("COURSES_FILE")
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from);

        Ok(Self {
            database_url,
            bind_addr,
            persist_timeout: Duration::from_millis(persist_timeout_ms),
            courses_file,
        })
    }
}
