//! Storage module for the persisted dedup record
//!
//! This module handles all database operations for the crawler, including:
//! - SQLite database initialization and schema management
//! - Point lookups of already-followed logins
//! - Recording new follows exactly once per login

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStore;
pub use traits::{DedupStore, StorageError, StorageResult};

/// A durable fact that a follow was issued for a login
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FollowRecord {
    pub login: String,
    /// RFC 3339 timestamp of when the record was written
    pub followed_at: String,
}
