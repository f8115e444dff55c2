//! Ripple-Crawl: a polite, resumable web-crawl orchestration engine
//!
//! Given one or more seed URLs, the crawler discovers and fetches linked
//! resources while respecting a concurrency bound, per-host back-off rules,
//! retry budgets, depth limits and duplicate avoidance. Every lifecycle event
//! (fetch, error, redirect, discovered link, rejected link, retry) is reported
//! to registered observers.

pub mod config;
pub mod crawler;
pub mod observer;
pub mod state;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for Ripple-Crawl operations
#[derive(Debug, Error)]
pub enum RippleError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Store error: {0}")]
    Store(#[from] storage::StoreError),

    #[error("URL error: {0}")]
    Url(#[from] UrlError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL: {0}")]
    MissingHost(String),
}

/// Result type alias for Ripple-Crawl operations
pub type Result<T> = std::result::Result<T, RippleError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{CrawlRequest, CrawlTask, Crawler, CrawlerBuilder, QueueInput, TaskOptions};
pub use observer::{CrawlFailure, CrawlResult, ErrorContext, Observer};
pub use state::HostErrorState;
pub use storage::{CrawlStore, MemoryStore, SqliteStore, StoreError};
