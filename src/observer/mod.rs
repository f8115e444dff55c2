//! Lifecycle events and the observers that consume them
//!
//! Observers implement any subset of the [`Observer`] hooks; the rest default
//! to no-ops. A hook returning is its acknowledgement: the pipeline does not
//! move on until every observer has returned.

mod console;
mod dispatcher;
mod stats;

pub use console::ConsoleObserver;
pub use dispatcher::Dispatcher;
pub use stats::{print_statistics, CrawlStatistics, StatsObserver};

use crate::crawler::{CrawlTask, FetchError, FetchResponse, ParsedPage};
use async_trait::async_trait;
use std::fmt;
use thiserror::Error;
use url::Url;

/// A completed fetch together with the task that produced it
#[derive(Debug, Clone)]
pub struct CrawlResult {
    pub response: FetchResponse,
    pub task: CrawlTask,
}

impl CrawlResult {
    /// URL that was requested
    pub fn url(&self) -> &Url {
        &self.task.url
    }

    pub fn status_code(&self) -> u16 {
        self.response.status_code
    }
}

/// Why a crawl was stopped for one task
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// The host exhausted its error ladder
    HostStopped(String),
    /// The store failed; only this task is abandoned
    Store(String),
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::HostStopped(host) => write!(f, "host {} is stopped", host),
            StopReason::Store(err) => write!(f, "store failure: {}", err),
        }
    }
}

/// Failures reported through [`Observer::on_error`]
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CrawlFailure {
    #[error("No options provided")]
    NoOptions,

    #[error("No url provided")]
    MissingUrl,

    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Domain of {0} is blacklisted")]
    DomainBlacklisted(String),

    #[error("Crawl stopped: {0}")]
    StopCrawl(StopReason),

    #[error("Redirect {status} from {url} has no Location header")]
    MissingLocation { url: String, status: u16 },

    #[error(transparent)]
    Transport(#[from] FetchError),
}

impl CrawlFailure {
    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            Self::NoOptions => "NO_OPTIONS",
            Self::MissingUrl => "NO_URL_OPTION",
            Self::InvalidUrl { .. } => "INVALID_URL",
            Self::DomainBlacklisted(_) => "DOMAINBLACKLIST",
            Self::StopCrawl(_) => "STOPCRAWL",
            Self::MissingLocation { .. } => "MISSING_LOCATION",
            Self::Transport(e) => e.code(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(e) if e.is_retryable())
    }
}

/// Task details delivered alongside an error
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorContext {
    /// `"unknown"` for input that never became a task
    pub url: String,
    pub method: String,
    pub proxy: Option<String>,
    pub current_retries: u32,
    pub max_retries: u32,
}

impl ErrorContext {
    pub fn for_task(task: &CrawlTask, proxy: Option<&str>) -> Self {
        Self {
            url: task.url.to_string(),
            method: task.options.method.clone(),
            proxy: proxy.map(str::to_string),
            current_retries: task.current_retries,
            max_retries: task.max_retries,
        }
    }

    /// Context for malformed input
    pub fn synthetic(url: Option<&str>) -> Self {
        Self {
            url: url.unwrap_or("unknown").to_string(),
            method: "GET".to_string(),
            proxy: None,
            current_retries: 0,
            max_retries: 0,
        }
    }
}

/// Receives crawl lifecycle events
///
/// # Example
///
/// ```
/// use async_trait::async_trait;
/// use ripple_crawl::observer::{CrawlResult, Observer};
/// use ripple_crawl::crawler::ParsedPage;
///
/// struct TitlePrinter;
///
/// #[async_trait]
/// impl Observer for TitlePrinter {
///     async fn on_fetch(&self, result: &CrawlResult, page: Option<&ParsedPage>) {
///         let title = page.and_then(|p| p.title.as_deref()).unwrap_or("-");
///         println!("{} {}", result.url(), title);
///     }
/// }
/// ```
#[async_trait]
pub trait Observer: Send + Sync {
    /// A fetch completed with any non-redirect status
    async fn on_fetch(&self, _result: &CrawlResult, _page: Option<&ParsedPage>) {}

    /// A task ended in failure, or input was malformed
    async fn on_error(&self, _error: &CrawlFailure, _context: &ErrorContext) {}

    async fn on_link_discovered(&self, _page: &Url, _link: &Url, _anchor: &str, _is_do_follow: bool) {}

    async fn on_image_discovered(&self, _page: &Url, _link: &Url, _alt: &str) {}

    async fn on_redirect(&self, _from: &Url, _to: &Url, _status_code: u16) {}

    async fn on_link_rejected(&self, _page: &Url, _link: &Url, _anchor: &str, _is_do_follow: bool) {}

    /// A retryable error will be retried
    async fn on_retry_scheduled(&self, _error: &CrawlFailure, _context: &ErrorContext) {}
}
