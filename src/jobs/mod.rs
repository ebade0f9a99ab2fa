//! Databricks jobs: the cached listing, selection, parallel launch and run watching.
//!
//! # Module Organization
//!
//! - `cache` - single-flight, time-bounded cache of the job listing
//! - `search` - regex and tag selectors over a cached listing
//! - `launch` - bounded-concurrency run triggering
//! - `watch` - polling loop that drives run handles to a terminal state

pub mod cache;
pub mod launch;
pub mod search;
pub mod watch;

pub use cache::{CacheEntry, JobCache};
pub use launch::{LaunchError, LaunchResult, launch};
pub use search::{Selector, SelectorError, search};
pub use watch::{RetryPolicy, RunTransition, WatchMode, WatchOutcome, watch};

use chrono::{DateTime, Utc};
use std::{collections::BTreeMap, fmt};

pub type JobId = i64;
pub type RunId = i64;

/// A named, remotely scheduled unit of batch work
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub id: JobId,
    pub name: String,
    pub tags: BTreeMap<String, String>,
}

impl Job {
    #[must_use]
    pub fn new(id: JobId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            tags: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }
}

/// Lifecycle state of a single run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Pending,
    Running,
    Succeeded,
    Failed,
    Cancelled,
}

impl RunState {
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Cancelled)
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "PENDING",
            Self::Running => "RUNNING",
            Self::Succeeded => "SUCCEEDED",
            Self::Failed => "FAILED",
            Self::Cancelled => "CANCELLED",
        };
        f.write_str(s)
    }
}

/// One triggered run, owned by the watcher while it is being polled
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunHandle {
    pub job_id: JobId,
    pub run_id: RunId,
    pub state: RunState,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    /// Produced under dry-run; no remote run exists
    pub simulated: bool,
    /// Set when polling gave up on this run
    pub poll_error: Option<String>,
}

impl RunHandle {
    #[must_use]
    pub fn pending(job_id: JobId, run_id: RunId) -> Self {
        Self {
            job_id,
            run_id,
            state: RunState::Pending,
            started_at: Utc::now(),
            ended_at: None,
            simulated: false,
            poll_error: None,
        }
    }

    #[must_use]
    pub fn simulated(job_id: JobId) -> Self {
        Self {
            simulated: true,
            ..Self::pending(job_id, 0)
        }
    }

    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Record a newly observed state. Terminal handles never change again.
    /// Returns true if the recorded state changed.
    pub fn observe(&mut self, state: RunState) -> bool {
        if self.is_terminal() || self.state == state {
            return false;
        }
        self.state = state;
        if state.is_terminal() {
            self.ended_at = Some(Utc::now());
        }
        true
    }
}
