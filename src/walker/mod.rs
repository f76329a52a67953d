//! Pagination walker
//!
//! Turns a page-based listing endpoint into a stream of users. Pages are
//! requested through the broker in increasing order, starting at page 1, for
//! as long as every page comes back full (`PAGE_SIZE` users). The first short
//! or empty page is the last one.
//!
//! Fetching runs on its own task and hands pages over a small buffered
//! channel, so the consumer works through one page while the next is in
//! flight.

mod page_walk;

pub use page_walk::PageWalk;

use crate::api::User;
use crate::broker::{BrokerHandle, BrokerResult};
use std::fmt;

/// Which side of the follow graph a walk lists
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Listing {
    /// Accounts the subject follows
    Following,
    /// Accounts following the subject
    Followers,
}

impl Listing {
    /// Fetches one page of this listing through the broker
    pub async fn fetch(
        self,
        broker: &BrokerHandle,
        subject: &str,
        page: u32,
    ) -> BrokerResult<Vec<User>> {
        match self {
            Self::Following => broker.list_following(subject, page).await,
            Self::Followers => broker.list_followers(subject, page).await,
        }
    }
}

impl fmt::Display for Listing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Following => write!(f, "following"),
            Self::Followers => write!(f, "followers"),
        }
    }
}

/// Walks every page of `listing` for `subject` and returns all users
pub async fn walk_all(
    broker: &BrokerHandle,
    subject: &str,
    listing: Listing,
) -> BrokerResult<Vec<User>> {
    PageWalk::start(broker.clone(), subject, listing)
        .collect()
        .await
}
