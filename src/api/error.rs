use chrono::{DateTime, Utc};
use thiserror::Error;

/// Failure of a single remote API call
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiFailure {
    /// The platform reported the rate limit budget as exhausted
    #[error("Rate limit exceeded: {message}")]
    RateLimited {
        message: String,
        reset_at: Option<DateTime<Utc>>,
    },

    /// Any other HTTP error status
    #[error("HTTP {status}")]
    Status {
        status: u16,
        /// Raw Retry-After header value, if present
        retry_after: Option<String>,
    },

    #[error("Request timed out")]
    Timeout,

    /// The request never produced a response
    #[error("Transport error: {0}")]
    Transport(String),

    /// A success response whose body could not be decoded
    #[error("Failed to decode response: {0}")]
    Decode(String),
}

impl ApiFailure {
    /// Creates a status failure without a Retry-After header
    pub fn status(status: u16) -> Self {
        Self::Status {
            status,
            retry_after: None,
        }
    }
}

impl From<reqwest::Error> for ApiFailure {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else if e.is_decode() {
            Self::Decode(e.to_string())
        } else {
            Self::Transport(e.to_string())
        }
    }
}

/// Result type for remote API calls
pub type ApiResult<T> = Result<T, ApiFailure>;
