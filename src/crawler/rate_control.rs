//! Per-host error escalation and request pacing
//!
//! Error bookkeeping for a host is serialized: the read, decision and write
//! of its [`HostErrorState`] happen under that host's lock, so concurrent
//! failures are all counted and escalations happen at exact thresholds.
//! Gating only reads.

use crate::crawler::task::CrawlTask;
use crate::state::{Escalation, HostErrorState};
use crate::storage::{CrawlStore, StoreResult};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{error, warn};

/// What the pipeline should do before fetching
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    /// Fetch, after sleeping for the delay if any
    Proceed(Option<Duration>),
    /// The host is stopped for the rest of the run
    Stopped,
}

/// Tracks consecutive failures per host and escalates through the rate ladder
#[derive(Debug, Default)]
pub struct HostErrorController {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl HostErrorController {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_for(&self, host: &str) -> Arc<Mutex<()>> {
        self.locks
            .entry(host.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Decides whether and when a task may hit its host
    pub async fn gate(&self, store: &dyn CrawlStore, task: &CrawlTask) -> StoreResult<Gate> {
        let options = &task.options;
        let state = match task.host() {
            Some(host) => store.get_host_errors(&host).await?,
            None => None,
        };

        if let Some(state) = &state {
            if !state.is_crawlable() {
                return Ok(Gate::Stopped);
            }
            if let Some(delay) = state.current_delay(&options.error_rates) {
                return Ok(Gate::Proceed(Some(delay)));
            }
        }

        if task.current_retries > 0 && !options.retry_timeout.is_zero() {
            return Ok(Gate::Proceed(Some(options.retry_timeout)));
        }

        if !options.rate_limits.is_zero() {
            return Ok(Gate::Proceed(Some(options.rate_limits)));
        }

        Ok(Gate::Proceed(None))
    }

    /// Counts a retryable error against the task's host
    ///
    /// On escalation to a new ladder rung the task gets a fresh retry budget.
    pub async fn record_error(
        &self,
        store: &dyn CrawlStore,
        task: &mut CrawlTask,
    ) -> StoreResult<Escalation> {
        let Some(host) = task.host() else {
            return Ok(Escalation::None);
        };

        let lock = self.lock_for(&host);
        let _guard = lock.lock().await;

        let mut state = store
            .get_host_errors(&host)
            .await?
            .unwrap_or_else(|| HostErrorState::new(host.clone()));

        let escalation = state.record_error(task.options.max_errors, task.options.error_rates.len());
        store.set_host_errors(&state).await?;

        match escalation {
            Escalation::RateLimited(index) => {
                warn!(
                    host = %host,
                    rung = index,
                    delay_ms = task.options.error_rates.get(index).copied().unwrap_or(0),
                    "Host escalated to a slower rate"
                );
                task.current_retries = 0;
                task.max_retries = task.options.retries;
            }
            Escalation::Stopped => {
                error!(host = %host, "Host exhausted its error ladder; stopping crawl on it");
            }
            Escalation::None => {}
        }

        Ok(escalation)
    }
}
