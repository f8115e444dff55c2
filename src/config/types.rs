use serde::Deserialize;

/// Main configuration structure for Ripple-Crawl
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    /// URLs the run starts from
    #[serde(default)]
    pub seeds: Vec<String>,

    /// Proxies rotated round-robin per request, when non-empty
    #[serde(default)]
    pub proxies: Vec<String>,

    #[serde(default)]
    pub crawler: CrawlerConfig,

    #[serde(default)]
    pub policy: PolicyConfig,

    #[serde(default)]
    pub store: StoreConfig,
}

/// Request, retry and back-off behaviour
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct CrawlerConfig {
    /// Maximum number of concurrent fetch pipelines
    pub max_connections: u32,

    /// Per-request timeout (milliseconds)
    pub timeout: u64,

    /// Retry budget for retryable transport errors
    pub retries: u32,

    /// Delay before a retried request (milliseconds)
    pub retry_timeout: u64,

    /// Delay before every request (milliseconds); non-zero forces one connection
    pub rate_limits: u64,

    /// Consecutive host errors before escalating; -1 disables escalation
    pub max_errors: i64,

    /// Ascending delay ladder applied to failing hosts (milliseconds)
    pub error_rates: Vec<u64>,

    pub skip_duplicates: bool,

    /// Maximum link depth; -1 means unbounded
    pub depth_limit: i64,

    pub follow_redirect: bool,

    pub method: String,

    pub user_agent: String,

    pub referer: Option<String>,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_connections: 10,
            timeout: 20_000,
            retries: 3,
            retry_timeout: 10_000,
            rate_limits: 0,
            max_errors: 5,
            error_rates: vec![200, 350, 500],
            skip_duplicates: true,
            depth_limit: -1,
            follow_redirect: false,
            method: "GET".to_string(),
            user_agent: "RippleBot".to_string(),
            referer: None,
        }
    }
}

impl CrawlerConfig {
    /// Concurrency actually used by the scheduler
    ///
    /// A non-zero rate limit serializes the whole run.
    pub fn effective_connections(&self) -> usize {
        if self.rate_limits > 0 {
            1
        } else {
            self.max_connections.max(1) as usize
        }
    }
}

/// Link eligibility rules
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct PolicyConfig {
    /// Follow links to other hosts of a start domain
    pub external_hosts: bool,

    /// Follow links to other registrable domains
    pub external_domains: bool,

    /// Only follow external links found on start-host pages
    pub first_external_link_only: bool,

    pub protocols: Vec<String>,

    pub domain_blacklist: Vec<String>,

    pub suffix_blacklist: Vec<String>,

    /// `<link rel>` values worth following
    pub link_types: Vec<String>,

    pub scripts: bool,
    pub links: bool,
    pub images: bool,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            external_hosts: false,
            external_domains: false,
            first_external_link_only: false,
            protocols: vec!["http".to_string(), "https".to_string()],
            domain_blacklist: Vec::new(),
            suffix_blacklist: Vec::new(),
            link_types: vec!["canonical".to_string(), "stylesheet".to_string()],
            scripts: true,
            links: true,
            images: true,
        }
    }
}

/// Which store backs the run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    #[default]
    Memory,
    Sqlite,
}

/// Store configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct StoreConfig {
    pub kind: StoreKind,

    /// Path to the SQLite database file
    pub path: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            kind: StoreKind::Memory,
            path: "./ripple.db".to_string(),
        }
    }
}
