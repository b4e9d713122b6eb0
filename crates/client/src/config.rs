//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! - `MARKETPLACE_API_URL` - Marketplace API (default: <http://localhost:8001>)
//! - `MAIN_BACKEND_URL` - Sourcing/SEO backend (default: <http://localhost:8000>)
//! - `MARKETPLACE_STORAGE_DIR` - Directory of the file storage (default: `.marketplace`)
//! - `MARKETPLACE_HTTP_TIMEOUT_SECS` - Timeout of every request (default: 30)

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use url::Url;

const DEFAULT_API_URL: &str = "http://localhost:8001";
const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";
const DEFAULT_STORAGE_DIR: &str = ".marketplace";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the marketplace API
    pub api_url: Url,
    /// Base URL of the main backend (sourcing, trends, agents)
    pub backend_url: Url,
    /// Directory used by `FileStorage`
    pub storage_dir: PathBuf,
    /// Timeout applied to every outgoing request
    pub http_timeout: Duration,
}

impl ClientConfig {
    /// Configuration for the given services with default storage and timeout.
    #[must_use]
    pub fn new(api_url: Url, backend_url: Url) -> Self {
        Self {
            api_url,
            backend_url,
            storage_dir: PathBuf::from(DEFAULT_STORAGE_DIR),
            http_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through `lookup`, falling back to defaults.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is invalid.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let url = |key: &str, default: &str| -> Result<Url, ConfigError> {
            let value = lookup(key).unwrap_or_else(|| default.to_string());
            Url::parse(&value).map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
        };

        let timeout_secs = match lookup("MARKETPLACE_HTTP_TIMEOUT_SECS") {
            Some(value) => value.parse::<u64>().ok().filter(|secs| *secs > 0).ok_or_else(|| {
                ConfigError::InvalidEnvVar(
                    "MARKETPLACE_HTTP_TIMEOUT_SECS".to_string(),
                    "must be a positive integer".to_string(),
                )
            })?,
            None => DEFAULT_TIMEOUT_SECS,
        };

        Ok(Self {
            api_url: url("MARKETPLACE_API_URL", DEFAULT_API_URL)?,
            backend_url: url("MAIN_BACKEND_URL", DEFAULT_BACKEND_URL)?,
            storage_dir: lookup("MARKETPLACE_STORAGE_DIR")
                .filter(|dir| !dir.is_empty())
                .map_or_else(|| PathBuf::from(DEFAULT_STORAGE_DIR), PathBuf::from),
            http_timeout: Duration::from_secs(timeout_secs),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<ClientConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        ClientConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.api_url.as_str(), "http://localhost:8001/");
        assert_eq!(config.backend_url.as_str(), "http://localhost:8000/");
        assert_eq!(config.storage_dir, PathBuf::from(".marketplace"));
        assert_eq!(config.http_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("MARKETPLACE_API_URL", "https://api.shop.sn"),
            ("MARKETPLACE_STORAGE_DIR", "/tmp/mkt"),
            ("MARKETPLACE_HTTP_TIMEOUT_SECS", "5"),
        ])
        .unwrap();
        assert_eq!(config.api_url.host_str(), Some("api.shop.sn"));
        assert_eq!(config.storage_dir, PathBuf::from("/tmp/mkt"));
        assert_eq!(config.http_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_invalid_values() {
        assert!(load(&[("MARKETPLACE_API_URL", "not a url")]).is_err());
        assert!(load(&[("MARKETPLACE_HTTP_TIMEOUT_SECS", "0")]).is_err());
        assert!(load(&[("MARKETPLACE_HTTP_TIMEOUT_SECS", "soon")]).is_err());
    }
}
