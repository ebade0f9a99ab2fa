use super::Job;
use crate::gateway::{Gateway, GatewayError};
use chrono::{DateTime, Utc};
use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::{Duration, Instant},
};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, warn};

/// Snapshot of the complete job listing
#[derive(Debug)]
pub struct CacheEntry {
    pub jobs: Vec<Job>,
    pub fetched_at: DateTime<Utc>,
    fetched: Instant,
    generation: u64,
}

impl CacheEntry {
    #[must_use]
    pub fn age(&self) -> Duration {
        self.fetched.elapsed()
    }

    /// Increments on every successful refresh
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }
}

/// Job listing cache with a freshness window and single-flight refresh
///
/// Readers of a fresh entry only take the read lock. Refreshes are serialized
/// by `refresh`; callers that queued behind an in-flight refresh receive its
/// result, entry or error, instead of fetching again.
pub struct JobCache {
    gateway: Arc<dyn Gateway>,
    ttl: Duration,
    entry: RwLock<Option<Arc<CacheEntry>>>,
    /// Error of the last completed fetch, `None` after a success
    refresh: Mutex<Option<GatewayError>>,
    /// Completed fetches, bumped while `refresh` is held
    flights: AtomicU64,
}

impl JobCache {
    /// Create a cache over `gateway`; a zero `ttl` makes every `get` refetch
    #[must_use]
    pub fn new(gateway: Arc<dyn Gateway>, ttl: Duration) -> Self {
        Self {
            gateway,
            ttl,
            entry: RwLock::new(None),
            refresh: Mutex::new(None),
            flights: AtomicU64::new(0),
        }
    }

    /// Return the cached listing, refreshing it when missing, stale or forced
    ///
    /// # Errors
    ///
    /// Returns the gateway error if a needed refresh fails. The previous
    /// entry, if any, is kept.
    pub async fn get(&self, force_refresh: bool) -> Result<Arc<CacheEntry>, GatewayError> {
        let seen_flight = self.flights.load(Ordering::Acquire);
        let seen = self.current().await;
        if !force_refresh
            && let Some(entry) = &seen
            && self.is_fresh(entry)
        {
            return Ok(entry.clone());
        }
        let seen_generation = seen.as_ref().map_or(0, |e| e.generation);

        let mut last_error = self.refresh.lock().await;

        // A fetch completed while we waited for the lock; share its result
        if self.flights.load(Ordering::Acquire) != seen_flight {
            if let Some(err) = last_error.as_ref() {
                debug!(error = %err, "joined failed job refresh");
                return Err(err.clone());
            }
            if let Some(entry) = self.current().await {
                debug!(generation = entry.generation, "joined in-flight job refresh");
                return Ok(entry);
            }
        }

        debug!(force_refresh, "fetching job listing");
        let result = self.gateway.list_jobs().await;
        self.flights.fetch_add(1, Ordering::AcqRel);
        let jobs = match result {
            Ok(jobs) => jobs,
            Err(err) => {
                warn!(error = %err, "job listing refresh failed, keeping previous entry");
                *last_error = Some(err.clone());
                return Err(err);
            }
        };
        *last_error = None;

        let entry = Arc::new(CacheEntry {
            jobs,
            fetched_at: Utc::now(),
            fetched: Instant::now(),
            generation: seen_generation + 1,
        });
        *self.entry.write().await = Some(entry.clone());
        debug!(jobs = entry.jobs.len(), generation = entry.generation, "job cache replaced");
        Ok(entry)
    }

    /// The current entry without any freshness check
    pub async fn peek(&self) -> Option<Arc<CacheEntry>> {
        self.current().await
    }

    async fn current(&self) -> Option<Arc<CacheEntry>> {
        self.entry.read().await.clone()
    }

    fn is_fresh(&self, entry: &CacheEntry) -> bool {
        entry.age() < self.ttl
    }
}
