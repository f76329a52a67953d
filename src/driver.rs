//! Driver loop - top-level iteration
//!
//! Each iteration moves through three phases and then starts over:
//!
//! 1. `FETCH_SEED`: resolve the operating account and walk its following list
//! 2. `DISPATCH`: hand every followed account to the traversal engine
//! 3. `WAIT`: block until the engine has processed all of them
//!
//! There is no delay between iterations; pacing comes from the broker's
//! rate limit backoff.

use crate::broker::BrokerHandle;
use crate::traversal::{BatchReport, TraversalEngine};
use crate::walker::{walk_all, Listing};
use crate::RippleError;

/// Summary of one completed iteration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IterationReport {
    pub iteration: u64,
    /// Login of the operating account
    pub account: String,
    pub batch: BatchReport,
}

/// Orchestrates iterations over a broker and a traversal engine
pub struct Driver {
    broker: BrokerHandle,
    engine: TraversalEngine,
}

impl Driver {
    pub fn new(broker: BrokerHandle, engine: TraversalEngine) -> Self {
        Self { broker, engine }
    }

    /// Runs iterations until `limit` is reached, or forever when `limit` is `None`
    ///
    /// Only a fatal error ends an unbounded run.
    pub async fn run(&self, limit: Option<u64>) -> Result<(), RippleError> {
        let mut iteration = 0;
        loop {
            if limit.is_some_and(|max| iteration >= max) {
                tracing::info!("Reached iteration limit of {}", iteration);
                return Ok(());
            }
            iteration += 1;
            self.run_iteration(iteration).await?;
        }
    }

    /// Runs one FETCH_SEED -> DISPATCH -> WAIT cycle
    pub async fn run_iteration(&self, iteration: u64) -> Result<IterationReport, RippleError> {
        let rate = self.broker.rate_status().await?;
        tracing::info!(
            "Iteration {}: {} requests remaining, limit resets at {}",
            iteration,
            rate.remaining,
            rate.reset_at
        );

        // FETCH_SEED
        let me = self.broker.get_user("").await?;
        tracing::info!("Resolved identity: {}", me.login);

        let seeds = walk_all(&self.broker, &me.login, Listing::Following).await?;
        tracing::info!("{} follows {} accounts", me.login, seeds.len());

        // DISPATCH + WAIT
        let subjects = seeds.into_iter().map(|user| user.login).collect();
        let batch = self.engine.run_batch(subjects).await?;

        tracing::info!(
            "Iteration {} complete: {} subjects, {} candidates, {} skipped, {} followed",
            iteration,
            batch.subjects,
            batch.candidates,
            batch.skipped,
            batch.followed
        );

        Ok(IterationReport {
            iteration,
            account: me.login,
            batch,
        })
    }
}
