//! Crawl run context
//!
//! A `Crawler` owns everything one run needs: the store, the task queue,
//! the observers and the run-wide default options. It is built per run and
//! dropped once the run has drained, so independent runs can share a
//! process without sharing state.

use crate::config::Config;
use crate::crawler::depth::{mark_seed, DepthPolicy, FirstDiscovery};
use crate::crawler::fetcher::{Fetcher, HttpFetcher};
use crate::crawler::pipeline::Pipeline;
use crate::crawler::proxy::ProxyRotator;
use crate::crawler::scheduler::TaskQueue;
use crate::crawler::task::{CrawlRequest, CrawlTask, QueueInput, TaskOptions};
use crate::observer::{CrawlFailure, Dispatcher, ErrorContext, Observer};
use crate::storage::{CrawlStore, MemoryStore};
use crate::url::normalize_url;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Assembles a `Crawler` from a configuration and optional collaborators
pub struct CrawlerBuilder {
    config: Config,
    store: Option<Arc<dyn CrawlStore>>,
    fetcher: Option<Arc<dyn Fetcher>>,
    observers: Vec<Arc<dyn Observer>>,
    options: Option<TaskOptions>,
    depth_policy: Option<Arc<dyn DepthPolicy>>,
}

impl CrawlerBuilder {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            store: None,
            fetcher: None,
            observers: Vec::new(),
            options: None,
            depth_policy: None,
        }
    }

    /// Uses `store` instead of a fresh `MemoryStore`
    pub fn store(mut self, store: Arc<dyn CrawlStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Uses `fetcher` instead of the reqwest-backed `HttpFetcher`
    pub fn fetcher(mut self, fetcher: Arc<dyn Fetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    pub fn observer(mut self, observer: Arc<dyn Observer>) -> Self {
        self.observers.push(observer);
        self
    }

    /// Overrides the defaults derived from the configuration
    pub fn options(mut self, options: TaskOptions) -> Self {
        self.options = Some(options);
        self
    }

    /// Uses `policy` to assign link depths instead of `FirstDiscovery`
    pub fn depth_policy(mut self, policy: Arc<dyn DepthPolicy>) -> Self {
        self.depth_policy = Some(policy);
        self
    }

    pub fn build(self) -> Crawler {
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(MemoryStore::new()) as Arc<dyn CrawlStore>);
        let fetcher = self
            .fetcher
            .unwrap_or_else(|| Arc::new(HttpFetcher::new()) as Arc<dyn Fetcher>);
        let defaults = self
            .options
            .unwrap_or_else(|| TaskOptions::from(&self.config));
        let max_connections = self.config.crawler.effective_connections() as usize;

        info!(
            store = store.name(),
            max_connections,
            observers = self.observers.len(),
            "Crawler ready"
        );

        let pipeline = Arc::new(Pipeline::new(
            store,
            fetcher,
            Dispatcher::new(self.observers),
            ProxyRotator::new(self.config.proxies.clone()),
            self.depth_policy
                .unwrap_or_else(|| Arc::new(FirstDiscovery) as Arc<dyn DepthPolicy>),
        ));
        let queue = TaskQueue::new(max_connections, pipeline.clone());

        Crawler {
            pipeline,
            queue,
            defaults: Arc::new(defaults),
            queued_any: AtomicBool::new(false),
        }
    }
}

/// One crawl run
///
/// # Example
///
/// ```no_run
/// use ripple_crawl::{Config, Crawler};
///
/// # async fn example() {
/// let crawler = Crawler::builder(Config::default()).build();
/// crawler.crawl(vec!["https://example.com/"]).await;
/// # }
/// ```
pub struct Crawler {
    pipeline: Arc<Pipeline>,
    queue: TaskQueue<CrawlTask>,
    defaults: Arc<TaskOptions>,
    queued_any: AtomicBool,
}

impl Crawler {
    pub fn builder(config: Config) -> CrawlerBuilder {
        CrawlerBuilder::new(config)
    }

    /// Submits work: a URL, a request with its own options, or a batch
    ///
    /// Malformed entries are reported through `on_error` instead of being
    /// returned, and never stop the rest of the batch.
    pub async fn queue(&self, input: impl Into<QueueInput>) {
        let _hold = self.queue.hold();
        self.queued_any.store(true, Ordering::SeqCst);

        for entry in input.into().flatten() {
            self.queue_one(entry).await;
        }
    }

    async fn queue_one(&self, entry: Option<CrawlRequest>) {
        let request = match entry {
            Some(request) => request,
            None => {
                self.reject(CrawlFailure::NoOptions, None).await;
                return;
            }
        };

        let raw = match request.url {
            Some(raw) => raw,
            None => {
                self.reject(CrawlFailure::MissingUrl, None).await;
                return;
            }
        };

        let url = match normalize_url(&raw) {
            Ok(url) => url,
            Err(err) => {
                let failure = CrawlFailure::InvalidUrl {
                    url: raw.clone(),
                    reason: err.to_string(),
                };
                self.reject(failure, Some(&raw)).await;
                return;
            }
        };

        let options = match request.options {
            Some(options) => Arc::new(options),
            None => self.defaults.clone(),
        };
        let task = CrawlTask::new(url, options);
        let store = self.pipeline.store();

        if let Err(err) = store.add_start_origins(std::slice::from_ref(&task.url)).await {
            warn!(url = %task.url, error = %err, "Failed to record start origin");
        }
        if let Err(err) = mark_seed(store.as_ref(), task.url.as_str()).await {
            warn!(url = %task.url, error = %err, "Failed to record seed depth");
        }

        match self.pipeline.admit(task.clone(), &self.queue).await {
            Ok(true) => debug!(url = %task.url, "Seed queued"),
            Ok(false) => {}
            Err(failure) => {
                let context = ErrorContext::for_task(&task, None);
                self.pipeline.dispatcher().error(&failure, &context).await;
            }
        }
    }

    async fn reject(&self, failure: CrawlFailure, url: Option<&str>) {
        warn!(code = failure.code(), error = %failure, "Rejected queued input");
        let context = ErrorContext::synthetic(url);
        self.pipeline.dispatcher().error(&failure, &context).await;
    }

    /// Waits for the run to drain
    ///
    /// Returns immediately when nothing was ever queued.
    pub async fn wait(&self) {
        if !self.queued_any.load(Ordering::SeqCst) && self.queue.idle() {
            self.queue.fire_drain();
        }
        self.queue.drained().await;
        info!(peak_concurrency = self.queue.peak_running(), "Crawl drained");
    }

    /// Queues `seeds` and waits for the run to drain
    ///
    /// # Arguments
    ///
    /// * `seeds` - A URL, a `CrawlRequest`, or a batch of either
    ///
    /// # Returns
    ///
    /// Nothing. Pages, links and failures are reported to the observers while
    /// the run is in progress; the future resolves once no work is left.
    pub async fn crawl(&self, seeds: impl Into<QueueInput>) {
        self.queue(seeds).await;
        self.wait().await;
    }

    /// Re-queues URLs an interrupted run claimed but never completed
    ///
    /// Returns how many were queued.
    pub async fn resume(&self) -> usize {
        let _hold = self.queue.hold();
        let store = self.pipeline.store();

        let urls = match store.interrupted_urls().await {
            Ok(urls) => urls,
            Err(err) => {
                warn!(error = %err, "Failed to load interrupted URLs");
                return 0;
            }
        };

        let mut queued = 0;
        for raw in urls {
            let url = match normalize_url(&raw) {
                Ok(url) => url,
                Err(err) => {
                    warn!(url = %raw, error = %err, "Skipping unparseable stored URL");
                    continue;
                }
            };

            if let Err(err) = store.remove_from_history(url.as_str()).await {
                warn!(url = %url, error = %err, "Failed to release stored URL");
                continue;
            }

            let task = CrawlTask::new(url, self.defaults.clone());
            if let Ok(true) = self.pipeline.admit(task, &self.queue).await {
                queued += 1;
            }
        }

        if queued > 0 {
            self.queued_any.store(true, Ordering::SeqCst);
        }
        info!(queued, "Resumed interrupted URLs");
        queued
    }

    /// Re-queues interrupted URLs and `seeds` together, then waits for drain
    ///
    /// Returns how many interrupted URLs were resumed.
    pub async fn crawl_resumed(&self, seeds: impl Into<QueueInput>) -> usize {
        let hold = self.queue.hold();
        let resumed = self.resume().await;
        self.queue(seeds).await;
        drop(hold);

        self.wait().await;
        resumed
    }

    /// Point-in-time check that nothing is queued or running
    pub fn idle(&self) -> bool {
        self.queue.idle()
    }

    /// Highest number of tasks that ran at the same time
    pub fn peak_concurrency(&self) -> usize {
        self.queue.peak_running()
    }

    pub fn store(&self) -> &Arc<dyn CrawlStore> {
        self.pipeline.store()
    }
}
