//! Depth bookkeeping on top of the store
//!
//! By default depth is assigned on first discovery and never lowered by a
//! later, shorter path. A run can swap in another [`DepthPolicy`].

use crate::storage::{CrawlStore, StoreResult};
use async_trait::async_trait;

/// Decides the depth of a link discovered on a page
#[async_trait]
pub trait DepthPolicy: Send + Sync {
    /// Records the depth of `link` as found on `parent` and returns it
    async fn update_depth(&self, store: &dyn CrawlStore, parent: &str, link: &str) -> StoreResult<u32>;
}

/// Keeps the depth of the first path that reached a link
#[derive(Debug, Default, Clone, Copy)]
pub struct FirstDiscovery;

#[async_trait]
impl DepthPolicy for FirstDiscovery {
    async fn update_depth(&self, store: &dyn CrawlStore, parent: &str, link: &str) -> StoreResult<u32> {
        update_depth(store, parent, link).await
    }
}

/// Lowers a link's depth whenever a shorter path to it turns up
///
/// Links already admitted keep their task; only later depth checks see the
/// lower value.
#[derive(Debug, Default, Clone, Copy)]
pub struct ShortestPath;

#[async_trait]
impl DepthPolicy for ShortestPath {
    async fn update_depth(&self, store: &dyn CrawlStore, parent: &str, link: &str) -> StoreResult<u32> {
        let parent_depth = mark_seed(store, parent).await?;
        let candidate = parent_depth + 1;

        match store.get_depth(link).await? {
            Some(depth) if depth <= candidate => Ok(depth),
            _ => {
                store.set_depth(link, candidate).await?;
                Ok(candidate)
            }
        }
    }
}

/// Records the depth of `link` as found on `parent` and returns it
///
/// An unknown parent is treated as a root at depth 0.
pub async fn update_depth(store: &dyn CrawlStore, parent: &str, link: &str) -> StoreResult<u32> {
    let parent_depth = match store.get_depth(parent).await? {
        Some(depth) => depth,
        None => {
            store.set_depth(parent, 0).await?;
            0
        }
    };

    match store.get_depth(link).await? {
        Some(depth) => Ok(depth),
        None => {
            let depth = parent_depth + 1;
            store.set_depth(link, depth).await?;
            Ok(depth)
        }
    }
}

/// Gives `to` the depth of `from` unless `to` already has one
///
/// Used for redirect targets, which sit at the depth of the URL that
/// redirected to them.
pub async fn inherit_depth(store: &dyn CrawlStore, from: &str, to: &str) -> StoreResult<u32> {
    if let Some(depth) = store.get_depth(to).await? {
        return Ok(depth);
    }

    let depth = store.get_depth(from).await?.unwrap_or(0);
    store.set_depth(to, depth).await?;
    Ok(depth)
}

/// Records a seed at depth 0 unless it already has a depth
pub async fn mark_seed(store: &dyn CrawlStore, url: &str) -> StoreResult<u32> {
    match store.get_depth(url).await? {
        Some(depth) => Ok(depth),
        None => {
            store.set_depth(url, 0).await?;
            Ok(0)
        }
    }
}
