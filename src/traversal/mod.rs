//! Traversal engine - the follower expansion step
//!
//! This module contains the worker pool that expands subjects:
//! - A fixed pool of long-lived worker tasks sharing one job queue
//! - Per subject: walk its followers, skip recorded candidates, follow the rest
//! - Per batch: dispatch every subject, then wait for all of them to finish

mod engine;
mod worker;

pub use engine::{BatchReport, TraversalEngine};
pub use worker::SubjectReport;
