//! Crawl task and per-request options
//!
//! A [`CrawlTask`] is created for every queued URL and carries an immutable,
//! shared [`TaskOptions`] so per-request tuning survives retries, redirects
//! and link expansion.

use crate::config::Config;
use crate::url::host;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Injected crawl-eligibility capability
///
/// When set, its answer is authoritative once every built-in policy rule
/// has passed.
pub trait CrawlPredicate: Send + Sync {
    fn can_crawl(&self, parent: &Url, link: &Url, anchor: &str, is_do_follow: bool) -> bool;
}

impl<F> CrawlPredicate for F
where
    F: Fn(&Url, &Url, &str, bool) -> bool + Send + Sync,
{
    fn can_crawl(&self, parent: &Url, link: &Url, anchor: &str, is_do_follow: bool) -> bool {
        self(parent, link, anchor, is_do_follow)
    }
}

/// Options carried by every task of a run
#[derive(Clone)]
pub struct TaskOptions {
    pub method: String,
    pub user_agent: String,
    pub referer: Option<String>,
    pub proxy: Option<String>,
    pub timeout: Duration,

    pub retries: u32,
    pub retry_timeout: Duration,
    pub rate_limits: Duration,
    /// `None` disables host escalation
    pub max_errors: Option<u32>,
    /// Ascending ladder of host delays (milliseconds)
    pub error_rates: Vec<u64>,

    pub skip_duplicates: bool,
    /// `None` means unbounded
    pub depth_limit: Option<u32>,
    pub follow_redirect: bool,

    pub external_hosts: bool,
    pub external_domains: bool,
    pub first_external_link_only: bool,
    pub protocols: Vec<String>,
    pub domain_blacklist: Vec<String>,
    pub suffix_blacklist: Vec<String>,
    pub link_types: Vec<String>,
    pub scripts: bool,
    pub links: bool,
    pub images: bool,

    pub can_crawl: Option<Arc<dyn CrawlPredicate>>,
}

impl TaskOptions {
    /// Installs a crawl predicate
    pub fn with_predicate(mut self, predicate: impl CrawlPredicate + 'static) -> Self {
        self.can_crawl = Some(Arc::new(predicate));
        self
    }

    /// Returns true if a link at `depth` may be admitted
    pub fn within_depth(&self, depth: u32) -> bool {
        self.depth_limit.map_or(true, |limit| depth <= limit)
    }
}

impl From<&Config> for TaskOptions {
    fn from(config: &Config) -> Self {
        let crawler = &config.crawler;
        let policy = &config.policy;

        Self {
            method: crawler.method.to_uppercase(),
            user_agent: crawler.user_agent.clone(),
            referer: crawler.referer.clone().filter(|r| !r.is_empty()),
            proxy: None,
            timeout: Duration::from_millis(crawler.timeout),
            retries: crawler.retries,
            retry_timeout: Duration::from_millis(crawler.retry_timeout),
            rate_limits: Duration::from_millis(crawler.rate_limits),
            max_errors: u32::try_from(crawler.max_errors).ok().filter(|m| *m > 0),
            error_rates: crawler.error_rates.clone(),
            skip_duplicates: crawler.skip_duplicates,
            depth_limit: u32::try_from(crawler.depth_limit).ok(),
            follow_redirect: crawler.follow_redirect,
            external_hosts: policy.external_hosts,
            external_domains: policy.external_domains,
            first_external_link_only: policy.first_external_link_only,
            protocols: policy.protocols.iter().map(|p| p.to_lowercase()).collect(),
            domain_blacklist: policy.domain_blacklist.iter().map(|d| d.to_lowercase()).collect(),
            suffix_blacklist: policy.suffix_blacklist.iter().map(|s| s.to_lowercase()).collect(),
            link_types: policy.link_types.iter().map(|t| t.to_lowercase()).collect(),
            scripts: policy.scripts,
            links: policy.links,
            images: policy.images,
            can_crawl: None,
        }
    }
}

impl Default for TaskOptions {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl fmt::Debug for TaskOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskOptions")
            .field("method", &self.method)
            .field("user_agent", &self.user_agent)
            .field("proxy", &self.proxy)
            .field("timeout", &self.timeout)
            .field("retries", &self.retries)
            .field("max_errors", &self.max_errors)
            .field("error_rates", &self.error_rates)
            .field("skip_duplicates", &self.skip_duplicates)
            .field("depth_limit", &self.depth_limit)
            .field("follow_redirect", &self.follow_redirect)
            .field("can_crawl", &self.can_crawl.is_some())
            .finish_non_exhaustive()
    }
}

/// A URL scheduled for fetching
#[derive(Debug, Clone)]
pub struct CrawlTask {
    pub url: Url,
    /// Page the URL was discovered on; `None` for seeds
    pub parent_url: Option<Url>,
    pub current_retries: u32,
    pub max_retries: u32,
    pub options: Arc<TaskOptions>,
}

impl CrawlTask {
    pub fn new(url: Url, options: Arc<TaskOptions>) -> Self {
        Self {
            url,
            parent_url: None,
            current_retries: 0,
            max_retries: options.retries,
            options,
        }
    }

    /// Task for a link discovered on this task's page
    pub fn child(&self, url: Url) -> Self {
        Self {
            parent_url: Some(self.url.clone()),
            ..Self::new(url, self.options.clone())
        }
    }

    /// Task for a redirect target: same options, fresh retry budget
    pub fn redirected(&self, url: Url) -> Self {
        Self {
            parent_url: self.parent_url.clone(),
            ..Self::new(url, self.options.clone())
        }
    }

    pub fn host(&self) -> Option<String> {
        host(&self.url)
    }

    /// Returns true if another attempt is allowed
    pub fn can_retry(&self) -> bool {
        self.current_retries < self.max_retries
    }
}

/// A single entry submitted through `Crawler::queue`
#[derive(Debug, Clone, Default)]
pub struct CrawlRequest {
    pub url: Option<String>,
    /// Options for this URL; the run defaults apply when absent
    pub options: Option<TaskOptions>,
}

impl CrawlRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            options: None,
        }
    }

    pub fn with_options(mut self, options: TaskOptions) -> Self {
        self.options = Some(options);
        self
    }
}

/// What can be handed to `Crawler::queue`
#[derive(Debug, Clone)]
pub enum QueueInput {
    Url(String),
    Request(CrawlRequest),
    Batch(Vec<QueueInput>),
    /// Nothing at all; reported as a configuration error
    Empty,
}

impl QueueInput {
    /// Flattens nested batches into the requests they contain, in order
    pub fn flatten(self) -> Vec<Option<CrawlRequest>> {
        let mut out = Vec::new();
        let mut stack = vec![self];

        while let Some(input) = stack.pop() {
            match input {
                QueueInput::Url(url) => out.push(Some(CrawlRequest::new(url))),
                QueueInput::Request(request) => out.push(Some(request)),
                QueueInput::Empty => out.push(None),
                QueueInput::Batch(items) => stack.extend(items.into_iter().rev()),
            }
        }

        out
    }
}

impl From<&str> for QueueInput {
    fn from(url: &str) -> Self {
        QueueInput::Url(url.to_string())
    }
}

impl From<String> for QueueInput {
    fn from(url: String) -> Self {
        QueueInput::Url(url)
    }
}

impl From<Url> for QueueInput {
    fn from(url: Url) -> Self {
        QueueInput::Url(url.into())
    }
}

impl From<CrawlRequest> for QueueInput {
    fn from(request: CrawlRequest) -> Self {
        QueueInput::Request(request)
    }
}

impl<T: Into<QueueInput>> From<Vec<T>> for QueueInput {
    fn from(items: Vec<T>) -> Self {
        QueueInput::Batch(items.into_iter().map(Into::into).collect())
    }
}
