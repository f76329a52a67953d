//! Configuration module for Follow-Ripple
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Every section and key has a default, so an empty file is a valid configuration.
//!
//! # Example
//!
//! ```no_run
//! use follow_ripple::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("config.toml")).unwrap();
//! println!("Workers: {}", config.traversal.worker_count());
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{ApiConfig, Config, RetryConfig, StorageConfig, TraversalConfig};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};
