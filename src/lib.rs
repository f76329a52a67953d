//! Follow-Ripple: a rate-aware follower graph crawler
//!
//! This crate walks the accounts reachable from an account's "following" list,
//! inspects their followers, and follows every account it has not handled
//! before. All remote calls are serialized through a single broker task that
//! owns the rate-limit recovery logic, and every follow is recorded in a
//! persistent dedup store.

pub mod api;
pub mod broker;
pub mod config;
pub mod driver;
pub mod storage;
pub mod traversal;
pub mod walker;

#[cfg(test)]
pub(crate) mod testing;

use thiserror::Error;

/// Main error type for Follow-Ripple operations
#[derive(Debug, Error)]
pub enum RippleError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Broker error: {0}")]
    Broker(#[from] broker::BrokerError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Worker task failed: {0}")]
    Task(String),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Missing access token: environment variable {0} is unset or empty")]
    MissingCredential(String),
}

/// Result type alias for Follow-Ripple operations
pub type Result<T> = std::result::Result<T, RippleError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use api::{GithubClient, GraphApi, RateStatus, User};
pub use broker::{Broker, BrokerHandle};
pub use config::Config;
pub use driver::Driver;
pub use storage::{DedupStore, SqliteStore};
pub use traversal::TraversalEngine;
