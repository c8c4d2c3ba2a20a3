//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use meal_swap_core::{EngineSettings, MAX_ESTIMATOR_RETRIES};
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub database_url: String,
    pub log_level: Level,
    pub cors_origin: String,
    pub openai_api_key: Option<String>,
    /// Any OpenAI-compatible gateway, e.g. one that fronts a Gemini vision model.
    pub openai_base_url: Option<String>,
    pub vision_model: String,
    pub swap_count: usize,
    pub estimator_timeout: Duration,
    pub estimator_retries: u32,
    pub persist_wait: Duration,
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

    /// Builds the configuration from any key lookup. `from_env` passes the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // --- Server and Database Settings ---
        let bind_address_str =
            lookup("BIND_ADDRESS").unwrap_or_else(|| "0.0.0.0:3000".to_string());
        let bind_address = bind_address_str.parse::<SocketAddr>().map_err(|e| {
            ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
        })?;

        let database_url = lookup("DATABASE_URL")
            .ok_or_else(|| ConfigError::MissingVar("DATABASE_URL".to_string()))?;

        let log_level_str = lookup("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let cors_origin =
            lookup("CORS_ORIGIN").unwrap_or_else(|| "http://localhost:5173".to_string());

        // --- Vision Estimator Settings ---
        let openai_api_key = lookup("OPENAI_API_KEY");
        let openai_base_url = lookup("OPENAI_BASE_URL");
        let vision_model = lookup("VISION_MODEL").unwrap_or_else(|| "gpt-4o-mini".to_string());

        // --- Engine Settings ---
        let swap_count = parse_or(&lookup, "SWAP_COUNT", 3usize)?;
        if swap_count == 0 {
            return Err(ConfigError::InvalidValue(
                "SWAP_COUNT".to_string(),
                "must be at least 1".to_string(),
            ));
        }
        let estimator_timeout =
            Duration::from_secs(parse_or(&lookup, "ESTIMATOR_TIMEOUT_SECS", 30u64)?);
        let estimator_retries = parse_or(&lookup, "ESTIMATOR_RETRIES", 1u32)?;
        if estimator_retries > MAX_ESTIMATOR_RETRIES {
            return Err(ConfigError::InvalidValue(
                "ESTIMATOR_RETRIES".to_string(),
                format!("must be at most {}", MAX_ESTIMATOR_RETRIES),
            ));
        }
        let persist_wait = Duration::from_millis(parse_or(&lookup, "PERSIST_WAIT_MS", 200u64)?);

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            cors_origin,
            openai_api_key,
            openai_base_url,
            vision_model,
            swap_count,
            estimator_timeout,
            estimator_retries,
            persist_wait,
        })
    }

    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            max_swaps: self.swap_count,
            estimator_timeout: self.estimator_timeout,
            estimator_retries: self.estimator_retries,
            persist_wait: self.persist_wait,
            ..EngineSettings::default()
        }
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
