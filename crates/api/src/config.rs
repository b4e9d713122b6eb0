//! Marketplace API configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `MARKETPLACE_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//!
//! ## Optional
//! - `MARKETPLACE_HOST` - Bind address (default: 127.0.0.1)
//! - `MARKETPLACE_PORT` - Listen port (default: 8001)
//! - `MAIN_BACKEND_URL` - Sourcing/SEO backend (default: <http://localhost:8000>)
//! - `MARKETPLACE_CORS_ORIGINS` - Comma-separated allowed origins
//! - `MARKETPLACE_MEDIA_DIR` - Directory for downloaded product images; enables downloads
//! - `MARKETPLACE_RATE_LIMIT_PER_MINUTE` - Requests per minute per client IP (default: 300)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

const DEFAULT_CORS_ORIGINS: &str =
    "http://localhost:3000,http://localhost:3001,http://localhost:5173";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Marketplace API configuration.
///
/// Implements `Debug` manually to redact the database URL.
#[derive(Clone)]
pub struct ApiConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Base URL of the main backend (SEO generation, sourcing)
    pub main_backend_url: Url,
    /// Origins allowed by CORS
    pub cors_origins: Vec<String>,
    /// Where product images are downloaded; `None` disables downloads
    pub media_dir: Option<PathBuf>,
    /// Requests allowed per minute per client IP
    pub rate_limit_per_minute: u32,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("database_url", &"[REDACTED]")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("main_backend_url", &self.main_backend_url.as_str())
            .field("cors_origins", &self.cors_origins)
            .field("media_dir", &self.media_dir)
            .field("rate_limit_per_minute", &self.rate_limit_per_minute)
            .field("sentry_dsn", &self.sentry_dsn.as_ref().map(|_| "[REDACTED]"))
            .field("sentry_environment", &self.sentry_environment)
            .finish()
    }
}

impl ApiConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("MARKETPLACE_DATABASE_URL")?;
        let host = get_env_or_default("MARKETPLACE_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("MARKETPLACE_HOST".to_string(), e.to_string())
            })?;
        let port = get_env_or_default("MARKETPLACE_PORT", "8001")
            .parse::<u16>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("MARKETPLACE_PORT".to_string(), e.to_string())
            })?;
        let main_backend_url = Url::parse(&get_env_or_default(
            "MAIN_BACKEND_URL",
            "http://localhost:8000",
        ))
        .map_err(|e| ConfigError::InvalidEnvVar("MAIN_BACKEND_URL".to_string(), e.to_string()))?;
        let cors_origins = parse_origins(&get_env_or_default(
            "MARKETPLACE_CORS_ORIGINS",
            DEFAULT_CORS_ORIGINS,
        ));
        let media_dir = get_optional_env("MARKETPLACE_MEDIA_DIR")
            .filter(|dir| !dir.is_empty())
            .map(PathBuf::from);
        let rate_limit_per_minute = get_env_or_default("MARKETPLACE_RATE_LIMIT_PER_MINUTE", "300")
            .parse::<u32>()
            .ok()
            .filter(|limit| *limit > 0)
            .ok_or_else(|| {
                ConfigError::InvalidEnvVar(
                    "MARKETPLACE_RATE_LIMIT_PER_MINUTE".to_string(),
                    "must be a positive integer".to_string(),
                )
            })?;

        Ok(Self {
            database_url,
            host,
            port,
            main_backend_url,
            cors_origins,
            media_dir,
            rate_limit_per_minute,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Configuration with defaults for everything but the database and backend.
    #[must_use]
    pub fn with_defaults(database_url: &str, main_backend_url: Url) -> Self {
        Self {
            database_url: SecretString::from(database_url),
            host: IpAddr::from([127, 0, 0, 1]),
            port: 8001,
            main_backend_url,
            cors_origins: parse_origins(DEFAULT_CORS_ORIGINS),
            media_dir: None,
            rate_limit_per_minute: 300,
            sentry_dsn: None,
            sentry_environment: None,
        }
    }
}

fn parse_origins(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_origins() {
        assert_eq!(
            parse_origins(" http://a.test , ,http://b.test"),
            vec!["http://a.test".to_string(), "http://b.test".to_string()]
        );
        assert!(parse_origins("").is_empty());
    }

    #[test]
    fn test_default_origins() {
        assert_eq!(parse_origins(DEFAULT_CORS_ORIGINS).len(), 3);
    }

    fn config(database_url: &str) -> ApiConfig {
        ApiConfig::with_defaults(database_url, Url::parse("http://localhost:8000").unwrap())
    }

    #[test]
    fn test_socket_addr() {
        let mut config = config("postgres://localhost/test");
        config.port = 9100;
        let addr = config.socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 9100);
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let mut config = config("postgres://user:hunter2@db/marketplace");
        config.sentry_dsn = Some("https://key@sentry.example/1".to_string());

        let debug_output = format!("{config:?}");

        assert!(debug_output.contains("localhost:8000"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("hunter2"));
        assert!(!debug_output.contains("key@sentry"));
    }
}
