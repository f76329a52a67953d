//! Request broker - the single point of contact with the remote API
//!
//! All remote calls are queued to one broker task, which executes them one at
//! a time. Rate limit state and the API handle never leave that task, so no
//! locking is needed around them. Failed calls are retried according to the
//! `RetryPolicy` until they succeed or fail in a way that cannot be recovered;
//! callers only ever see a result or a fatal `BrokerError`.

mod request;
mod retry;

pub use request::{Envelope, Operation, Reply};
pub use retry::{Backoff, RetryPolicy, Sleeper, TokioSleeper};

use crate::api::{ApiFailure, GraphApi, RateStatus, User};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

/// Capacity of the request queue in front of the broker task
const REQUEST_QUEUE: usize = 64;

/// Errors surfaced to broker callers
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BrokerError {
    /// The remote API failed in a way the retry policy cannot recover from
    #[error("Unrecoverable API failure: {0}")]
    Fatal(ApiFailure),

    /// Querying rate status during rate limit recovery failed
    #[error("Failed to query rate status: {0}")]
    RateStatus(ApiFailure),

    #[error("Broker task is no longer running")]
    Closed,

    #[error("Broker replied with the wrong payload for {0}")]
    UnexpectedReply(String),
}

/// Result type for broker calls
pub type BrokerResult<T> = Result<T, BrokerError>;

/// Broker task state: the API handle, the retry policy and the sleeper
pub struct Broker<A, S> {
    api: A,
    policy: RetryPolicy,
    sleeper: S,
}

impl<A, S> Broker<A, S>
where
    A: GraphApi + 'static,
    S: Sleeper + 'static,
{
    pub fn new(api: A, policy: RetryPolicy, sleeper: S) -> Self {
        Self {
            api,
            policy,
            sleeper,
        }
    }

    /// Starts the broker task and returns a handle to it
    ///
    /// The task stops once every handle has been dropped.
    pub fn spawn(self) -> BrokerHandle {
        let (requests, queue) = mpsc::channel(REQUEST_QUEUE);
        tokio::spawn(self.run(queue));
        BrokerHandle { requests }
    }

    async fn run(self, mut queue: mpsc::Receiver<Envelope>) {
        while let Some(envelope) = queue.recv().await {
            let result = self.execute(&envelope.operation).await;
            // A caller that gave up waiting is not an error
            let _ = envelope.reply.send(result);
        }
        tracing::debug!("All broker handles dropped, broker stopping");
    }

    /// Runs one operation until it succeeds or fails fatally
    async fn execute(&self, operation: &Operation) -> BrokerResult<Reply> {
        loop {
            match self.call(operation).await {
                Ok(reply) => return Ok(reply),
                Err(failure) => self.recover(operation, failure).await?,
            }
        }
    }

    async fn call(&self, operation: &Operation) -> Result<Reply, ApiFailure> {
        match operation {
            Operation::GetUser { login } => self.api.get_user(login).await.map(Reply::User),
            Operation::ListFollowing { login, page } => self
                .api
                .list_following(login, *page)
                .await
                .map(Reply::Users),
            Operation::ListFollowers { login, page } => self
                .api
                .list_followers(login, *page)
                .await
                .map(Reply::Users),
            Operation::Follow { login } => self.api.follow(login).await.map(|()| Reply::Followed),
            Operation::RateStatus => self.api.rate_status().await.map(Reply::Rate),
        }
    }

    /// Waits out a recoverable failure, or returns the fatal error
    async fn recover(&self, operation: &Operation, failure: ApiFailure) -> BrokerResult<()> {
        match self.policy.classify(&failure) {
            Backoff::AwaitRateReset => {
                tracing::warn!("Rate limit hit during {}: {}", operation, failure);
                self.await_rate_reset().await
            }
            Backoff::Sleep(delay) => {
                tracing::warn!(
                    "{} failed ({}), retrying in {}s",
                    operation,
                    failure,
                    delay.as_secs()
                );
                self.sleeper.sleep(delay).await;
                Ok(())
            }
            Backoff::Fatal => Err(BrokerError::Fatal(failure)),
        }
    }

    /// Polls rate status, sleeping between polls, until the budget recovers
    async fn await_rate_reset(&self) -> BrokerResult<()> {
        let mut rate = self.poll_rate().await?;
        while !rate.has_budget() {
            tracing::info!(
                "Rate budget exhausted, resets at {}; sleeping {}s",
                rate.reset_at,
                self.policy.rate_poll_interval.as_secs()
            );
            self.sleeper.sleep(self.policy.rate_poll_interval).await;
            rate = self.poll_rate().await?;
        }
        Ok(())
    }

    async fn poll_rate(&self) -> BrokerResult<RateStatus> {
        self.api.rate_status().await.map_err(|failure| {
            tracing::error!("Rate status query failed: {}", failure);
            BrokerError::RateStatus(failure)
        })
    }
}

/// Cloneable handle used by every component that talks to the remote API
///
/// Each call blocks the caller until the broker has a final answer, which can
/// take minutes under sustained rate limiting.
#[derive(Debug, Clone)]
pub struct BrokerHandle {
    requests: mpsc::Sender<Envelope>,
}

impl BrokerHandle {
    /// Queues an operation and waits for its reply
    pub async fn submit(&self, operation: Operation) -> BrokerResult<Reply> {
        let (reply, response) = oneshot::channel();
        self.requests
            .send(Envelope { operation, reply })
            .await
            .map_err(|_| BrokerError::Closed)?;
        response.await.map_err(|_| BrokerError::Closed)?
    }

    /// Gets a user profile; an empty login resolves the authenticated account
    pub async fn get_user(&self, login: &str) -> BrokerResult<User> {
        match self
            .submit(Operation::GetUser {
                login: login.to_string(),
            })
            .await?
        {
            Reply::User(user) => Ok(user),
            _ => Err(BrokerError::UnexpectedReply("get_user".to_string())),
        }
    }

    pub async fn list_following(&self, login: &str, page: u32) -> BrokerResult<Vec<User>> {
        match self
            .submit(Operation::ListFollowing {
                login: login.to_string(),
                page,
            })
            .await?
        {
            Reply::Users(users) => Ok(users),
            _ => Err(BrokerError::UnexpectedReply("list_following".to_string())),
        }
    }

    pub async fn list_followers(&self, login: &str, page: u32) -> BrokerResult<Vec<User>> {
        match self
            .submit(Operation::ListFollowers {
                login: login.to_string(),
                page,
            })
            .await?
        {
            Reply::Users(users) => Ok(users),
            _ => Err(BrokerError::UnexpectedReply("list_followers".to_string())),
        }
    }

    pub async fn follow(&self, login: &str) -> BrokerResult<()> {
        match self
            .submit(Operation::Follow {
                login: login.to_string(),
            })
            .await?
        {
            Reply::Followed => Ok(()),
            _ => Err(BrokerError::UnexpectedReply("follow".to_string())),
        }
    }

    pub async fn rate_status(&self) -> BrokerResult<RateStatus> {
        match self.submit(Operation::RateStatus).await? {
            Reply::Rate(rate) => Ok(rate),
            _ => Err(BrokerError::UnexpectedReply("rate_status".to_string())),
        }
    }
}
