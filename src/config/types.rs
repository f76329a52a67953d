use crate::ConfigError;
use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for Follow-Ripple
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub traversal: TraversalConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

impl Config {
    /// Reads the access token from the environment variable named by `api.token-env`
    pub fn access_token(&self) -> Result<String, ConfigError> {
        match std::env::var(&self.api.token_env) {
            Ok(token) if !token.trim().is_empty() => Ok(token.trim().to_string()),
            _ => Err(ConfigError::MissingCredential(self.api.token_env.clone())),
        }
    }
}

/// Remote API connection settings
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the REST API
    #[serde(rename = "base-url", default = "default_base_url")]
    pub base_url: String,

    /// Name of the environment variable holding the access token
    #[serde(rename = "token-env", default = "default_token_env")]
    pub token_env: String,

    /// Timeout for every individual remote call (seconds)
    #[serde(rename = "request-timeout", default = "default_request_timeout")]
    pub request_timeout: u64,

    /// User-Agent header sent with every request
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,
}

impl ApiConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            token_env: default_token_env(),
            request_timeout: default_request_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

/// Worker pool settings
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TraversalConfig {
    /// Number of traversal workers (0 = one per available CPU)
    #[serde(default)]
    pub workers: u32,
}

impl TraversalConfig {
    /// Resolves the configured worker count, expanding 0 to the available parallelism
    pub fn worker_count(&self) -> usize {
        if self.workers > 0 {
            return self.workers as usize;
        }
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4)
    }
}

/// Backoff tiers used by the request broker
#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    /// Sleep after an HTTP 429 without a usable Retry-After header (seconds)
    #[serde(rename = "default-retry-after", default = "default_retry_after")]
    pub default_retry_after: u64,

    /// Interval between rate status polls while the budget is exhausted (seconds)
    #[serde(rename = "rate-poll-interval", default = "default_rate_poll_interval")]
    pub rate_poll_interval: u64,

    /// Sleep after any other failed call (seconds)
    #[serde(rename = "failure-backoff", default = "default_failure_backoff")]
    pub failure_backoff: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            default_retry_after: default_retry_after(),
            rate_poll_interval: default_rate_poll_interval(),
            failure_backoff: default_failure_backoff(),
        }
    }
}

/// Dedup store settings
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path", default = "default_database_path")]
    pub database_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

fn default_base_url() -> String {
    "https://api.github.com".to_string()
}

fn default_token_env() -> String {
    "GITHUB_TOKEN".to_string()
}

fn default_request_timeout() -> u64 {
    50
}

fn default_user_agent() -> String {
    concat!("follow-ripple/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_retry_after() -> u64 {
    60
}

fn default_rate_poll_interval() -> u64 {
    60
}

fn default_failure_backoff() -> u64 {
    10
}

fn default_database_path() -> String {
    "./follow-ripple.db".to_string()
}
