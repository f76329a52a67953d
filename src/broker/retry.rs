//! Retry policy for remote calls
//!
//! | Failure | Backoff |
//! |---------|---------|
//! | Rate limit error | Poll rate status until `remaining >= 1` |
//! | HTTP 429 | Sleep `Retry-After` seconds (default 60) |
//! | Other HTTP >= 400 | Sleep 10s |
//! | Timeout | Sleep 10s |
//! | Transport / decode | Fatal |

use crate::api::ApiFailure;
use crate::config::RetryConfig;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// What the broker does after a failed call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// Sleep, then retry the same operation
    Sleep(Duration),
    /// Poll rate status until the budget recovers, then retry
    AwaitRateReset,
    /// Surface the failure to the caller
    Fatal,
}

/// Maps call failures onto backoff tiers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Sleep after a 429 without a usable Retry-After header
    pub default_retry_after: Duration,
    /// Interval between rate status polls while exhausted
    pub rate_poll_interval: Duration,
    /// Sleep after any other HTTP >= 400 or a timeout
    pub failure_backoff: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            default_retry_after: Duration::from_secs(config.default_retry_after),
            rate_poll_interval: Duration::from_secs(config.rate_poll_interval),
            failure_backoff: Duration::from_secs(config.failure_backoff),
        }
    }

    /// Classifies a failure
    pub fn classify(&self, failure: &ApiFailure) -> Backoff {
        match failure {
            ApiFailure::RateLimited { .. } => Backoff::AwaitRateReset,
            ApiFailure::Status {
                status: 429,
                retry_after,
            } => Backoff::Sleep(self.retry_after(retry_after.as_deref())),
            ApiFailure::Status { status, .. } if *status >= 400 => {
                Backoff::Sleep(self.failure_backoff)
            }
            ApiFailure::Timeout => Backoff::Sleep(self.failure_backoff),
            ApiFailure::Status { .. } | ApiFailure::Transport(_) | ApiFailure::Decode(_) => {
                Backoff::Fatal
            }
        }
    }

    /// Parses a Retry-After header as whole seconds
    pub fn retry_after(&self, header: Option<&str>) -> Duration {
        header
            .and_then(|value| value.trim().parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(self.default_retry_after)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

/// Source of backoff delays
///
/// The broker only ever waits through this trait, so tests can replace real
/// sleeps with recorded ones.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Sleeps on the tokio timer
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

#[async_trait]
impl<T: Sleeper + ?Sized> Sleeper for Arc<T> {
    async fn sleep(&self, duration: Duration) {
        (**self).sleep(duration).await;
    }
}
