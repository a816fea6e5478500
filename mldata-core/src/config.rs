// mldata-core/src/config.rs

//! Configuration management for the dataset client.
//!
//! This module provides configuration parsing from TOML files, environment
//! variable overrides, and validation of configuration values.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{ClientError, Result};

/// Top-level client configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub server: ServerConfig,
    pub cache: CacheConfig,
    pub pools: PoolConfig,
}

/// Connection settings for the remote dataset service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Base URL of the service, e.g. "http://localhost:5555".
    pub url: String,
    /// Bearer token sent with every request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Owner namespace used to qualify bare dataset names.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_prefix: Option<String>,
    /// Overrides the page size announced by the server session.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_size: Option<usize>,
    /// Connection timeout in milliseconds.
    pub connect_timeout_ms: u64,
    /// Per-request deadline in milliseconds.
    pub request_timeout_ms: u64,
    /// Maximum number of retries for transient failures.
    pub max_retries: u32,
    /// Initial delay (milliseconds) between retries.
    pub retry_delay_ms: u64,
    /// Maximum delay (milliseconds) between retries.
    pub max_retry_delay_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:5555".to_string(),
            token: None,
            token_prefix: None,
            page_size: None,
            connect_timeout_ms: 5_000,
            request_timeout_ms: 30_000,
            max_retries: 3,
            retry_delay_ms: 100,
            max_retry_delay_ms: 5_000,
        }
    }
}

// Page cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    // Seconds a cached page stays valid after the last cache write.
    pub page_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { page_ttl_secs: 30 }
    }
}

impl CacheConfig {
    pub fn page_ttl(&self) -> Duration {
        Duration::from_secs(self.page_ttl_secs)
    }
}

// Worker pool sizing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    // Concurrent index, page and metadata requests.
    pub key_workers: usize,
    // Concurrent content-bundle requests.
    pub content_workers: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            key_workers: 4,
            content_workers: 4,
        }
    }
}

impl FromStr for ClientConfig {
    type Err = ClientError;

    /// Parse configuration from a TOML string.
    fn from_str(s: &str) -> Result<Self> {
        toml::from_str(s)
            .map_err(|e| ClientError::config_with_source("failed to parse TOML config", e))
    }
}

impl ClientConfig {
    // Load configuration from a TOML file.
    //
    // # Errors
    //
    // Returns an error if the file cannot be read, parsed or is invalid.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ClientError::io(path, "failed to read config file", e))?;
        let config: Self = content.parse()?;
        config.validate()?;
        Ok(config)
    }

    // Apply environment variable overrides.
    //
    // Variables are prefixed with `MLDATA_` and name the section and field,
    // e.g. `MLDATA_SERVER_URL` or `MLDATA_POOLS_KEY_WORKERS`. Values that do
    // not parse are ignored.
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(val) = std::env::var("MLDATA_SERVER_URL") {
            self.server.url = val;
        }
        if let Ok(val) = std::env::var("MLDATA_SERVER_TOKEN") {
            self.server.token = Some(val);
        }
        if let Ok(val) = std::env::var("MLDATA_SERVER_TOKEN_PREFIX") {
            self.server.token_prefix = Some(val);
        }
        if let Ok(val) = std::env::var("MLDATA_SERVER_PAGE_SIZE") {
            if let Ok(v) = val.parse() {
                self.server.page_size = Some(v);
            }
        }
        if let Ok(val) = std::env::var("MLDATA_SERVER_CONNECT_TIMEOUT_MS") {
            if let Ok(v) = val.parse() {
                self.server.connect_timeout_ms = v;
            }
        }
        if let Ok(val) = std::env::var("MLDATA_SERVER_REQUEST_TIMEOUT_MS") {
            if let Ok(v) = val.parse() {
                self.server.request_timeout_ms = v;
            }
        }
        if let Ok(val) = std::env::var("MLDATA_SERVER_MAX_RETRIES") {
            if let Ok(v) = val.parse() {
                self.server.max_retries = v;
            }
        }

        if let Ok(val) = std::env::var("MLDATA_CACHE_PAGE_TTL_SECS") {
            if let Ok(v) = val.parse() {
                self.cache.page_ttl_secs = v;
            }
        }

        if let Ok(val) = std::env::var("MLDATA_POOLS_KEY_WORKERS") {
            if let Ok(v) = val.parse() {
                self.pools.key_workers = v;
            }
        }
        if let Ok(val) = std::env::var("MLDATA_POOLS_CONTENT_WORKERS") {
            if let Ok(v) = val.parse() {
                self.pools.content_workers = v;
            }
        }

        self
    }

    // Validate all configuration values.
    //
    // # Errors
    //
    // Returns an error if any configuration value is invalid.
    pub fn validate(&self) -> Result<()> {
        if self.server.url.trim().is_empty() {
            return Err(ClientError::config("server.url must not be empty"));
        }
        if !self.server.url.starts_with("http://") && !self.server.url.starts_with("https://") {
            return Err(ClientError::config(
                "server.url must start with http:// or https://",
            ));
        }
        if self.server.page_size == Some(0) {
            return Err(ClientError::config(
                "server.page_size must be greater than 0",
            ));
        }
        if self.server.connect_timeout_ms == 0 {
            return Err(ClientError::config(
                "server.connect_timeout_ms must be greater than 0",
            ));
        }
        if self.server.request_timeout_ms == 0 {
            return Err(ClientError::config(
                "server.request_timeout_ms must be greater than 0",
            ));
        }

        if self.pools.key_workers == 0 {
            return Err(ClientError::config(
                "pools.key_workers must be greater than 0",
            ));
        }
        if self.pools.content_workers == 0 {
            return Err(ClientError::config(
                "pools.content_workers must be greater than 0",
            ));
        }

        Ok(())
    }
}
