//! Storage traits and error types
//!
//! This module defines the trait interface for dedup store backends and
//! associated error types.

use crate::storage::FollowRecord;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Storage lock poisoned")]
    Poisoned,
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Durable set of logins that have already been followed
///
/// Implementations must be safe to call from many workers at once; each
/// lookup and insert is atomic on its own, and no multi-call transactions
/// are required.
pub trait DedupStore: Send + Sync {
    /// Returns true if a follow was already recorded for `login`
    fn contains(&self, login: &str) -> StorageResult<bool>;

    /// Records a follow for `login`
    ///
    /// # Returns
    ///
    /// `true` if the record was created, `false` if it already existed
    fn record(&self, login: &str) -> StorageResult<bool>;

    /// Counts all recorded follows
    fn count(&self) -> StorageResult<u64>;

    /// Gets the most recently recorded follows, newest first
    fn recent(&self, limit: usize) -> StorageResult<Vec<FollowRecord>>;
}
