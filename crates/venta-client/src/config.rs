//! Client configuration module.
//!
//! Configuration is loaded from environment variables with fallback to
//! defaults suitable for a local backend.

use std::env;
use std::time::Duration;

/// REST client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Backend base URL. Must end with a trailing slash so relative
    /// endpoint joins resolve under it.
    pub base_url: String,

    /// Bearer token attached to every request, when the backend requires
    /// authentication.
    pub auth_token: Option<String>,

    /// Per-request timeout.
    pub timeout: Duration,
}

impl ClientConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let mut base_url =
            env::var("VENTA_API_URL").unwrap_or_else(|_| "http://localhost:8000/api/".to_string());
        if !base_url.ends_with('/') {
            base_url.push('/');
        }

        let timeout_secs: u64 = env::var("VENTA_API_TIMEOUT_SECS")
            .unwrap_or_else(|_| "15".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidValue("VENTA_API_TIMEOUT_SECS".to_string()))?;

        Ok(ClientConfig {
            base_url,
            auth_token: env::var("VENTA_API_TOKEN").ok(),
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            base_url: "http://localhost:8000/api/".to_string(),
            auth_token: None,
            timeout: Duration::from_secs(15),
        }
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Invalid base URL: {0}")]
    InvalidBaseUrl(String),

    #[error("HTTP client initialization failed: {0}")]
    Init(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.base_url, "http://localhost:8000/api/");
        assert!(config.auth_token.is_none());
        assert_eq!(config.timeout, Duration::from_secs(15));
    }
}
