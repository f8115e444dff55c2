//! In-memory store for single-process runs

use crate::state::HostErrorState;
use crate::storage::traits::{CrawlStore, OriginClassification, StoreResult};
use crate::url::{host, registrable_domain};
use async_trait::async_trait;
use dashmap::{DashMap, DashSet};
use url::Url;

/// Default store backed by concurrent hash maps
///
/// Each operation is atomic on its own; sequences of operations are not.
#[derive(Debug, Default)]
pub struct MemoryStore {
    history: DashSet<String>,
    depths: DashMap<String, u32>,
    host_errors: DashMap<String, HostErrorState>,
    start_hosts: DashSet<String>,
    start_domains: DashSet<String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of URLs currently claimed
    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn contains(&self, url: &str) -> bool {
        self.history.contains(url)
    }
}

#[async_trait]
impl CrawlStore for MemoryStore {
    async fn check_and_mark_history(&self, url: &str) -> StoreResult<bool> {
        Ok(!self.history.insert(url.to_string()))
    }

    async fn remove_from_history(&self, url: &str) -> StoreResult<()> {
        self.history.remove(url);
        Ok(())
    }

    async fn get_depth(&self, url: &str) -> StoreResult<Option<u32>> {
        Ok(self.depths.get(url).map(|d| *d))
    }

    async fn set_depth(&self, url: &str, depth: u32) -> StoreResult<()> {
        self.depths.insert(url.to_string(), depth);
        Ok(())
    }

    async fn get_host_errors(&self, host: &str) -> StoreResult<Option<HostErrorState>> {
        Ok(self.host_errors.get(host).map(|s| s.clone()))
    }

    async fn set_host_errors(&self, state: &HostErrorState) -> StoreResult<()> {
        self.host_errors.insert(state.host.clone(), state.clone());
        Ok(())
    }

    async fn add_start_origins(&self, urls: &[Url]) -> StoreResult<()> {
        for url in urls {
            if let Some(h) = host(url) {
                self.start_hosts.insert(h);
            }
            if let Some(d) = registrable_domain(url) {
                self.start_domains.insert(d);
            }
        }
        Ok(())
    }

    async fn classify(&self, parent: &Url, link: &Url) -> StoreResult<OriginClassification> {
        let is_start_host =
            |u: &Url| host(u).map_or(false, |h| self.start_hosts.contains(&h));
        let is_start_domain =
            |u: &Url| registrable_domain(u).map_or(false, |d| self.start_domains.contains(&d));

        Ok(OriginClassification {
            parent_is_start_host: is_start_host(parent),
            parent_is_start_domain: is_start_domain(parent),
            link_is_start_host: is_start_host(link),
            link_is_start_domain: is_start_domain(link),
        })
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
