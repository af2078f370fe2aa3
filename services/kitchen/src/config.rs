//! services/kitchen/src/config.rs
//!
//! Defines the service's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use sous_core::session::snapshot::{default_max_session_age, DEFAULT_HISTORY_LIMIT};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub log_level: Level,
    /// Directory the file-backed key-value store writes into.
    pub store_path: PathBuf,
    /// Persisted sessions older than this are discarded on startup.
    pub max_session_age: chrono::Duration,
    /// At most `DEFAULT_HISTORY_LIMIT`.
    pub history_limit: usize,
    pub tick_interval: Duration,
    pub persist_debounce: Duration,
    pub cors_origin: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([0, 0, 0, 0], 3000)),
            log_level: Level::INFO,
            store_path: PathBuf::from("./data"),
            max_session_age: default_max_session_age(),
            history_limit: DEFAULT_HISTORY_LIMIT,
            tick_interval: Duration::from_millis(1000),
            persist_debounce: Duration::from_millis(250),
            cors_origin: "http://localhost:3000".to_string(),
        }
    }
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        // --- Server Settings ---
        let bind_address = parse_or(&lookup, "BIND_ADDRESS", defaults.bind_address)?;

        let log_level_str = lookup("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let cors_origin = lookup("CORS_ORIGIN").unwrap_or(defaults.cors_origin);

        // --- Storage and Session Settings ---
        let store_path = lookup("STORE_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.store_path);

        let max_session_age = match lookup("MAX_SESSION_AGE_HOURS") {
            Some(_) => {
                let hours: i64 = parse_or(&lookup, "MAX_SESSION_AGE_HOURS", 0)?;
                chrono::Duration::try_hours(hours)
                    .filter(|age| *age > chrono::Duration::zero())
                    .ok_or_else(|| {
                        ConfigError::InvalidValue(
                            "MAX_SESSION_AGE_HOURS".to_string(),
                            format!("'{}' is not a usable positive number of hours", hours),
                        )
                    })?
            }
            None => defaults.max_session_age,
        };

        let history_limit = parse_or(&lookup, "HISTORY_LIMIT", defaults.history_limit)?;
        if history_limit == 0 || history_limit > DEFAULT_HISTORY_LIMIT {
            return Err(ConfigError::InvalidValue(
                "HISTORY_LIMIT".to_string(),
                format!("must be between 1 and {}", DEFAULT_HISTORY_LIMIT),
            ));
        }

        let tick_ms: u64 = parse_or(&lookup, "TICK_INTERVAL_MS", 1000)?;
        if tick_ms == 0 {
            return Err(ConfigError::InvalidValue(
                "TICK_INTERVAL_MS".to_string(),
                "must be greater than zero".to_string(),
            ));
        }
        let debounce_ms: u64 = parse_or(&lookup, "PERSIST_DEBOUNCE_MS", 250)?;

        Ok(Self {
            bind_address,
            log_level,
            store_path,
            max_session_age,
            history_limit,
            tick_interval: Duration::from_millis(tick_ms),
            persist_debounce: Duration::from_millis(debounce_ms),
            cors_origin,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidValue(key.to_string(), e.to_string())),
        None => Ok(default),
    }
}
