use crate::broker::BrokerHandle;
use crate::storage::DedupStore;
use crate::traversal::worker::{Job, JobQueue, SubjectReport, WorkerContext};
use crate::RippleError;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Totals for one dispatched batch of subjects
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub subjects: usize,
    pub candidates: usize,
    pub skipped: usize,
    pub followed: usize,
}

impl BatchReport {
    fn add(&mut self, subject: &SubjectReport) {
        self.subjects += 1;
        self.candidates += subject.candidates;
        self.skipped += subject.skipped;
        self.followed += subject.followed;
    }
}

/// Long-lived pool of traversal workers
///
/// The pool is created once and reused for every batch. Dropping the engine
/// closes the job queue; workers finish their current subject and exit.
pub struct TraversalEngine {
    jobs: mpsc::Sender<Job>,
    workers: Vec<JoinHandle<()>>,
}

impl TraversalEngine {
    /// Starts `workers` worker tasks (at least one)
    pub fn start(broker: BrokerHandle, store: Arc<dyn DedupStore>, workers: usize) -> Self {
        let workers = workers.max(1);
        let (jobs, queue) = mpsc::channel(workers);
        let queue: JobQueue = Arc::new(Mutex::new(queue));
        let context = Arc::new(WorkerContext { broker, store });

        let handles = (0..workers)
            .map(|id| {
                tracing::debug!("Adding worker {}", id);
                tokio::spawn(Arc::clone(&context).run(id, Arc::clone(&queue)))
            })
            .collect();

        Self {
            jobs,
            workers: handles,
        }
    }

    /// Number of workers in the pool
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Dispatches every subject to the pool and waits until all are processed
    ///
    /// Returns the first fatal error reported by any worker. Outcomes are
    /// watched while dispatching, and leaving this function (or dropping its
    /// future) cancels the batch: queued subjects are dropped unprocessed and
    /// subjects being expanded are aborted.
    pub async fn run_batch(&self, subjects: Vec<String>) -> Result<BatchReport, RippleError> {
        let mut report = BatchReport::default();
        if subjects.is_empty() {
            return Ok(report);
        }

        let cancel = CancellationToken::new();
        let _abandon = cancel.clone().drop_guard();
        let dispatched = subjects.len();

        // Sized so no worker ever blocks reporting an outcome
        let (done, mut outcomes) = mpsc::channel(dispatched);
        for subject in subjects {
            let permit = loop {
                tokio::select! {
                    biased;
                    Some(outcome) = outcomes.recv() => report.add(&outcome?),
                    permit = self.jobs.reserve() => break permit.map_err(|_| pool_shut_down())?,
                }
            };
            permit.send(Job {
                subject,
                done: done.clone(),
                cancel: cancel.clone(),
            });
        }
        drop(done);

        while let Some(outcome) = outcomes.recv().await {
            report.add(&outcome?);
        }

        // A worker that panicked drops its job without reporting
        if report.subjects != dispatched {
            return Err(RippleError::Task(format!(
                "{} of {} subjects were never reported",
                dispatched - report.subjects,
                dispatched
            )));
        }

        Ok(report)
    }
}

fn pool_shut_down() -> RippleError {
    RippleError::Task("worker pool has shut down".to_string())
}
