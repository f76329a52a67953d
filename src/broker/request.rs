//! Request envelopes exchanged between broker handles and the broker task

use crate::api::{RateStatus, User};
use crate::broker::BrokerResult;
use std::fmt;
use tokio::sync::oneshot;

/// One remote operation, with its own typed parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// Resolve a profile; an empty login is the authenticated account
    GetUser { login: String },
    ListFollowing { login: String, page: u32 },
    ListFollowers { login: String, page: u32 },
    Follow { login: String },
    RateStatus,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GetUser { login } if login.is_empty() => write!(f, "get_user(<me>)"),
            Self::GetUser { login } => write!(f, "get_user({})", login),
            Self::ListFollowing { login, page } => {
                write!(f, "list_following({}, page {})", login, page)
            }
            Self::ListFollowers { login, page } => {
                write!(f, "list_followers({}, page {})", login, page)
            }
            Self::Follow { login } => write!(f, "follow({})", login),
            Self::RateStatus => write!(f, "rate_status"),
        }
    }
}

/// Successful result of an `Operation`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    User(User),
    Users(Vec<User>),
    Followed,
    Rate(RateStatus),
}

/// A queued operation paired with its single-use reply channel
#[derive(Debug)]
pub struct Envelope {
    pub operation: Operation,
    pub reply: oneshot::Sender<BrokerResult<Reply>>,
}
