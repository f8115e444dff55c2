//! Store trait and error types
//!
//! The crawl engine only talks to its history/depth/host-state backend
//! through [`CrawlStore`], so an in-memory map and a durable database are
//! interchangeable.

use crate::state::HostErrorState;
use async_trait::async_trait;
use thiserror::Error;
use url::Url;

/// Errors that can occur during store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store backend error: {0}")]
    Backend(String),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Store lock poisoned")]
    Poisoned,

    #[error("Corrupt store record: {0}")]
    Corrupt(String),
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Where a parent page and a discovered link sit relative to the run's start origins
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OriginClassification {
    pub parent_is_start_host: bool,
    pub parent_is_start_domain: bool,
    pub link_is_start_host: bool,
    pub link_is_start_domain: bool,
}

/// Trait for history/depth/host-state backends
///
/// Every single operation must be atomic; in particular
/// [`check_and_mark_history`](CrawlStore::check_and_mark_history) is a
/// check-and-set, so two concurrent callers for the same URL see exactly one
/// `false`.
#[async_trait]
pub trait CrawlStore: Send + Sync {
    // ===== History =====

    /// Claims a URL; returns `true` if it was already present
    async fn check_and_mark_history(&self, url: &str) -> StoreResult<bool>;

    /// Releases a claim so the URL can be scheduled again
    async fn remove_from_history(&self, url: &str) -> StoreResult<()>;

    /// Records that the pipeline for a claimed URL ran to completion
    async fn mark_completed(&self, _url: &str) -> StoreResult<()> {
        Ok(())
    }

    /// URLs that were claimed but never completed, for resuming a run
    async fn interrupted_urls(&self) -> StoreResult<Vec<String>> {
        Ok(Vec::new())
    }

    // ===== Depth =====

    async fn get_depth(&self, url: &str) -> StoreResult<Option<u32>>;

    async fn set_depth(&self, url: &str, depth: u32) -> StoreResult<()>;

    // ===== Host error state =====

    async fn get_host_errors(&self, host: &str) -> StoreResult<Option<HostErrorState>>;

    async fn set_host_errors(&self, state: &HostErrorState) -> StoreResult<()>;

    // ===== Start origins =====

    /// Records the hosts and registrable domains of the given seed URLs
    async fn add_start_origins(&self, urls: &[Url]) -> StoreResult<()>;

    async fn classify(&self, parent: &Url, link: &Url) -> StoreResult<OriginClassification>;

    /// Short backend name for logs
    fn name(&self) -> &'static str;
}
