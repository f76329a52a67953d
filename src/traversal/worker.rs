//! Worker side of the traversal engine
//!
//! A worker expands one subject at a time. Follows for a subject's candidates
//! run concurrently in a `JoinSet`; the subject only counts as processed once
//! every follow in that set has finished, so at most one subject's follower
//! set is in flight per worker.
//!
//! Jobs carry their batch's cancellation token. A worker drops jobs from a
//! cancelled batch unprocessed and aborts the subject it is expanding when
//! its batch is cancelled mid-flight.

use crate::broker::BrokerHandle;
use crate::storage::DedupStore;
use crate::walker::{Listing, PageWalk};
use crate::RippleError;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// One subject to expand, with the channel its outcome is reported on
pub(crate) struct Job {
    pub subject: String,
    pub done: mpsc::Sender<Result<SubjectReport, RippleError>>,
    /// Cancelled once the owning batch is abandoned
    pub cancel: CancellationToken,
}

/// Shared job queue; workers take turns receiving from it
pub(crate) type JobQueue = Arc<Mutex<mpsc::Receiver<Job>>>;

/// Outcome of expanding one subject
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubjectReport {
    pub subject: String,
    /// Distinct followers discovered
    pub candidates: usize,
    /// Candidates already present in the dedup store
    pub skipped: usize,
    /// Follows issued and recorded
    pub followed: usize,
}

/// Everything a worker needs, shared by the whole pool
pub(crate) struct WorkerContext {
    pub broker: BrokerHandle,
    pub store: Arc<dyn DedupStore>,
}

impl WorkerContext {
    /// Worker loop: runs until the job queue is closed
    pub(crate) async fn run(self: Arc<Self>, id: usize, jobs: JobQueue) {
        tracing::debug!("Worker {} started", id);
        loop {
            let job = {
                let mut queue = jobs.lock().await;
                queue.recv().await
            };
            let Some(job) = job else {
                break;
            };

            if job.cancel.is_cancelled() {
                tracing::debug!("Worker {} dropping {}: batch abandoned", id, job.subject);
                continue;
            }

            let outcome = tokio::select! {
                biased;
                _ = job.cancel.cancelled() => {
                    // Dropping the expansion aborts its follows
                    tracing::debug!("Worker {} aborted {}: batch abandoned", id, job.subject);
                    continue;
                }
                outcome = self.expand(&job.subject) => outcome,
            };
            if let Err(e) = &outcome {
                tracing::error!("Worker {} failed on {}: {}", id, job.subject, e);
            }
            let _ = job.done.send(outcome).await;
        }
        tracing::debug!("Worker {} stopped", id);
    }

    /// Follows every unrecorded follower of `subject`
    pub(crate) async fn expand(&self, subject: &str) -> Result<SubjectReport, RippleError> {
        let mut report = SubjectReport {
            subject: subject.to_string(),
            ..SubjectReport::default()
        };
        let mut seen = HashSet::new();
        let mut follows = JoinSet::new();

        let mut walk = PageWalk::start(self.broker.clone(), subject, Listing::Followers);
        while let Some(candidate) = walk.next().await {
            let login = candidate?.login;
            if !seen.insert(login.clone()) {
                continue;
            }
            report.candidates += 1;

            if self.is_recorded(&login) {
                report.skipped += 1;
                continue;
            }

            let broker = self.broker.clone();
            let store = Arc::clone(&self.store);
            follows.spawn(follow_and_record(broker, store, login));
        }

        while let Some(joined) = follows.join_next().await {
            match joined {
                Ok(Ok(())) => report.followed += 1,
                // Dropping the set aborts the follows still in flight
                Ok(Err(e)) => return Err(e),
                Err(e) => return Err(RippleError::Task(e.to_string())),
            }
        }

        tracing::debug!(
            "Expanded {}: {} candidates, {} skipped, {} followed",
            subject,
            report.candidates,
            report.skipped,
            report.followed
        );
        Ok(report)
    }

    /// Dedup lookup; a failed lookup counts as "not recorded"
    fn is_recorded(&self, login: &str) -> bool {
        match self.store.contains(login) {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!("Dedup lookup for {} failed, treating as new: {}", login, e);
                false
            }
        }
    }
}

/// Follows `login` through the broker and writes its dedup record
///
/// A failed record write is logged and otherwise ignored.
async fn follow_and_record(
    broker: BrokerHandle,
    store: Arc<dyn DedupStore>,
    login: String,
) -> Result<(), RippleError> {
    broker.follow(&login).await?;
    tracing::info!("Followed: {}", login);

    if let Err(e) = store.record(&login) {
        tracing::warn!("Failed to record follow for {}: {}", login, e);
    }
    Ok(())
}
