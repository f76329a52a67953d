//! Test doubles for the remote API and the broker's sleeper

use crate::api::{ApiFailure, ApiResult, GraphApi, RateStatus, User, PAGE_SIZE};
use crate::broker::Sleeper;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

impl ApiFailure {
    pub(crate) fn rate_limited() -> Self {
        Self::RateLimited {
            message: "API rate limit exceeded for user ID 1.".to_string(),
            reset_at: None,
        }
    }
}

/// A remote call as observed by `ScriptedApi`
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Call {
    GetUser(String),
    Following(String, u32),
    Followers(String, u32),
    Follow(String),
    RateStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum CallKind {
    GetUser,
    Following,
    Followers,
    Follow,
    RateStatus,
}

#[derive(Default)]
struct Script {
    me: String,
    following: HashMap<String, Vec<User>>,
    followers: HashMap<String, Vec<User>>,
    failures: HashMap<CallKind, VecDeque<ApiFailure>>,
    rates: VecDeque<u32>,
    calls: Vec<Call>,
}

/// In-memory graph that serves full pages of `PAGE_SIZE` users and can
/// inject failures per call kind
pub(crate) struct ScriptedApi {
    script: Mutex<Script>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedApi {
    pub(crate) fn new(me: &str) -> Self {
        Self {
            script: Mutex::new(Script {
                me: me.to_string(),
                ..Script::default()
            }),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub(crate) fn with_following(self, login: &str, users: &[&str]) -> Self {
        self.script
            .lock()
            .unwrap()
            .following
            .insert(login.to_string(), users.iter().map(|u| User::new(*u)).collect());
        self
    }

    pub(crate) fn with_followers(self, login: &str, users: &[&str]) -> Self {
        self.set_followers(login, users.iter().map(|u| User::new(*u)).collect());
        self
    }

    pub(crate) fn set_followers(&self, login: &str, users: Vec<User>) {
        self.script
            .lock()
            .unwrap()
            .followers
            .insert(login.to_string(), users);
    }

    /// Makes the next call of `kind` fail with `failure`; failures queue up
    pub(crate) fn fail_next(&self, kind: CallKind, failure: ApiFailure) {
        self.script
            .lock()
            .unwrap()
            .failures
            .entry(kind)
            .or_default()
            .push_back(failure);
    }

    /// Queues a `remaining` value for the next rate status query
    pub(crate) fn push_rate(&self, remaining: u32) {
        self.script.lock().unwrap().rates.push_back(remaining);
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.script.lock().unwrap().calls.clone()
    }

    pub(crate) fn count(&self, predicate: impl Fn(&Call) -> bool) -> usize {
        self.calls().iter().filter(|c| predicate(c)).count()
    }

    pub(crate) fn follows_of(&self, login: &str) -> usize {
        self.count(|c| matches!(c, Call::Follow(l) if l == login))
    }

    pub(crate) fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Records the call and pops an injected failure, if any
    async fn enter(&self, call: Call, kind: CallKind) -> ApiResult<()> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        // Give any concurrent caller a chance to overlap
        tokio::task::yield_now().await;

        let failure = {
            let mut script = self.script.lock().unwrap();
            script.calls.push(call);
            script.failures.get_mut(&kind).and_then(|q| q.pop_front())
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        match failure {
            Some(failure) => Err(failure),
            None => Ok(()),
        }
    }

    fn page(users: Option<&Vec<User>>, page: u32) -> Vec<User> {
        let Some(users) = users else {
            return Vec::new();
        };
        let start = (page.saturating_sub(1) as usize) * PAGE_SIZE;
        users.iter().skip(start).take(PAGE_SIZE).cloned().collect()
    }

    fn resolve(&self, login: &str) -> String {
        if login.is_empty() {
            self.script.lock().unwrap().me.clone()
        } else {
            login.to_string()
        }
    }
}

#[async_trait]
impl GraphApi for ScriptedApi {
    async fn get_user(&self, login: &str) -> ApiResult<User> {
        self.enter(Call::GetUser(login.to_string()), CallKind::GetUser)
            .await?;
        Ok(User::new(self.resolve(login)))
    }

    async fn list_following(&self, login: &str, page: u32) -> ApiResult<Vec<User>> {
        self.enter(Call::Following(login.to_string(), page), CallKind::Following)
            .await?;
        let login = self.resolve(login);
        let script = self.script.lock().unwrap();
        Ok(Self::page(script.following.get(&login), page))
    }

    async fn list_followers(&self, login: &str, page: u32) -> ApiResult<Vec<User>> {
        self.enter(Call::Followers(login.to_string(), page), CallKind::Followers)
            .await?;
        let login = self.resolve(login);
        let script = self.script.lock().unwrap();
        Ok(Self::page(script.followers.get(&login), page))
    }

    async fn follow(&self, login: &str) -> ApiResult<()> {
        self.enter(Call::Follow(login.to_string()), CallKind::Follow)
            .await
    }

    async fn rate_status(&self) -> ApiResult<RateStatus> {
        self.enter(Call::RateStatus, CallKind::RateStatus).await?;
        let remaining = self.script.lock().unwrap().rates.pop_front().unwrap_or(5000);
        Ok(RateStatus {
            remaining,
            reset_at: Utc::now(),
        })
    }
}

/// Sleeper that records requested delays and returns immediately
#[derive(Default)]
pub(crate) struct RecordingSleeper {
    sleeps: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub(crate) fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().unwrap().push(duration);
        tokio::task::yield_now().await;
    }
}

/// Builds `count` distinct users named `{prefix}{n}`
pub(crate) fn users(prefix: &str, count: usize) -> Vec<User> {
    (0..count)
        .map(|n| User::new(format!("{}{}", prefix, n)))
        .collect()
}
