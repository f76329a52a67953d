//! Remote graph API boundary
//!
//! This module defines everything the crawler knows about the code-hosting
//! platform:
//! - The `User` and `RateStatus` payloads
//! - The `ApiFailure` taxonomy every remote call can return
//! - The `GraphApi` trait the request broker drives
//! - A reqwest-backed `GithubClient` implementation

mod error;
mod github;

pub use error::{ApiFailure, ApiResult};
pub use github::{build_http_client, GithubClient};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::sync::Arc;

/// Number of users requested per listing page; a shorter page is the last one
pub const PAGE_SIZE: usize = 100;

/// A platform account as returned by user and listing endpoints
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct User {
    /// Login name, the unique key for dedup and graph edges
    pub login: String,
}

impl User {
    pub fn new(login: impl Into<String>) -> Self {
        Self {
            login: login.into(),
        }
    }
}

/// Snapshot of the remaining core request budget
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateStatus {
    /// Calls left in the current window
    pub remaining: u32,

    /// When the window resets
    pub reset_at: DateTime<Utc>,
}

impl RateStatus {
    /// Returns true if at least one call can be made now
    pub fn has_budget(&self) -> bool {
        self.remaining >= 1
    }
}

/// Operations exposed by the remote graph API
///
/// Implementations perform exactly one remote call per method and never retry;
/// recovery is the broker's job.
#[async_trait]
pub trait GraphApi: Send + Sync {
    /// Gets a user profile. An empty login resolves the authenticated account.
    async fn get_user(&self, login: &str) -> ApiResult<User>;

    /// Lists one page (1-based) of the accounts `login` follows
    async fn list_following(&self, login: &str, page: u32) -> ApiResult<Vec<User>>;

    /// Lists one page (1-based) of the accounts following `login`
    async fn list_followers(&self, login: &str, page: u32) -> ApiResult<Vec<User>>;

    /// Follows `login` as the authenticated account
    async fn follow(&self, login: &str) -> ApiResult<()>;

    /// Gets the current core rate limit status
    async fn rate_status(&self) -> ApiResult<RateStatus>;
}

#[async_trait]
impl<T: GraphApi + ?Sized> GraphApi for Arc<T> {
    async fn get_user(&self, login: &str) -> ApiResult<User> {
        (**self).get_user(login).await
    }

    async fn list_following(&self, login: &str, page: u32) -> ApiResult<Vec<User>> {
        (**self).list_following(login, page).await
    }

    async fn list_followers(&self, login: &str, page: u32) -> ApiResult<Vec<User>> {
        (**self).list_followers(login, page).await
    }

    async fn follow(&self, login: &str) -> ApiResult<()> {
        (**self).follow(login).await
    }

    async fn rate_status(&self) -> ApiResult<RateStatus> {
        (**self).rate_status().await
    }
}
