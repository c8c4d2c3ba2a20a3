//! services/api/src/error.rs
//!
//! Startup failures of the `api` binary. Request-time failures are mapped to HTTP
//! statuses in `web::rest` instead.

use crate::config::ConfigError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Connecting to PostgreSQL or running the embedded migrations failed.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Binding the listener or serving requests failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Startup settings that parse but cannot be used, e.g. a missing API key.
    #[error("Startup error: {0}")]
    Internal(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_errors_name_the_variable() {
        let err = ApiError::from(ConfigError::MissingVar("DATABASE_URL".to_string()));
        assert!(err.to_string().contains("DATABASE_URL"));
    }
}
