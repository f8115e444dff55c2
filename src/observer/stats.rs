//! Statistics collected from crawl events
//!
//! [`StatsObserver`] tallies every event it receives; [`print_statistics`]
//! renders a snapshot at the end of a run.

use crate::crawler::ParsedPage;
use crate::observer::{CrawlFailure, CrawlResult, ErrorContext, Observer};
use crate::url::host;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use url::Url;

/// Crawl statistics summary
#[derive(Debug, Clone, Default)]
pub struct CrawlStatistics {
    /// Fetches that produced a result (any non-redirect status)
    pub urls_fetched: u64,

    /// Results whose body was parsed as a document
    pub html_pages: u64,

    pub links_discovered: u64,
    pub images_discovered: u64,
    pub links_rejected: u64,
    pub redirects: u64,
    pub retries_scheduled: u64,

    /// Terminal errors keyed by error code
    pub errors_by_code: HashMap<String, u64>,

    pub pages_by_status: HashMap<u16, u64>,
    pub pages_by_host: HashMap<String, u64>,
    pub pages_by_content_type: HashMap<String, u64>,
}

impl CrawlStatistics {
    pub fn total_errors(&self) -> u64 {
        self.errors_by_code.values().sum()
    }
}

/// Observer that keeps running totals
#[derive(Debug, Default)]
pub struct StatsObserver {
    stats: Mutex<CrawlStatistics>,
}

impl StatsObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the current totals
    pub fn snapshot(&self) -> CrawlStatistics {
        self.stats
            .lock()
            .map(|s| s.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    fn update(&self, f: impl FnOnce(&mut CrawlStatistics)) {
        let mut stats = self
            .stats
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut stats);
    }
}

#[async_trait]
impl Observer for StatsObserver {
    async fn on_fetch(&self, result: &CrawlResult, page: Option<&ParsedPage>) {
        let host = host(&result.response.url).unwrap_or_default();
        let content_type = result
            .response
            .content_type()
            .and_then(|ct| ct.split(';').next())
            .map(|ct| ct.trim().to_lowercase())
            .unwrap_or_else(|| "unknown".to_string());

        self.update(|s| {
            s.urls_fetched += 1;
            if page.is_some() {
                s.html_pages += 1;
            }
            *s.pages_by_status.entry(result.status_code()).or_insert(0) += 1;
            *s.pages_by_host.entry(host).or_insert(0) += 1;
            *s.pages_by_content_type.entry(content_type).or_insert(0) += 1;
        });
    }

    async fn on_error(&self, error: &CrawlFailure, _context: &ErrorContext) {
        let code = error.code().to_string();
        self.update(|s| *s.errors_by_code.entry(code).or_insert(0) += 1);
    }

    async fn on_link_discovered(&self, _page: &Url, _link: &Url, _anchor: &str, _is_do_follow: bool) {
        self.update(|s| s.links_discovered += 1);
    }

    async fn on_image_discovered(&self, _page: &Url, _link: &Url, _alt: &str) {
        self.update(|s| s.images_discovered += 1);
    }

    async fn on_redirect(&self, _from: &Url, _to: &Url, _status_code: u16) {
        self.update(|s| s.redirects += 1);
    }

    async fn on_link_rejected(&self, _page: &Url, _link: &Url, _anchor: &str, _is_do_follow: bool) {
        self.update(|s| s.links_rejected += 1);
    }

    async fn on_retry_scheduled(&self, _error: &CrawlFailure, _context: &ErrorContext) {
        self.update(|s| s.retries_scheduled += 1);
    }
}

fn sorted_desc<K: Clone>(map: &HashMap<K, u64>) -> Vec<(K, u64)> {
    let mut entries: Vec<_> = map.iter().map(|(k, v)| (k.clone(), *v)).collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1));
    entries
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &CrawlStatistics) {
    println!("=== Crawl Statistics ===\n");

    println!("Overview:");
    println!("  URLs fetched: {}", stats.urls_fetched);
    println!("  HTML pages: {}", stats.html_pages);
    println!("  Links discovered: {}", stats.links_discovered);
    println!("  Images discovered: {}", stats.images_discovered);
    println!("  Links rejected: {}", stats.links_rejected);
    println!("  Redirects: {}", stats.redirects);
    println!("  Retries scheduled: {}", stats.retries_scheduled);
    println!();

    if !stats.pages_by_status.is_empty() {
        println!("Responses by Status:");
        for (status, count) in sorted_desc(&stats.pages_by_status) {
            let percentage = if stats.urls_fetched > 0 {
                (count as f64 / stats.urls_fetched as f64) * 100.0
            } else {
                0.0
            };
            println!("  {}: {} ({:.1}%)", status, count, percentage);
        }
        println!();
    }

    if !stats.pages_by_content_type.is_empty() {
        println!("Responses by Content-Type:");
        for (content_type, count) in sorted_desc(&stats.pages_by_content_type) {
            println!("  {}: {}", content_type, count);
        }
        println!();
    }

    if !stats.pages_by_host.is_empty() {
        println!("Hosts ({}):", stats.pages_by_host.len());
        for (host, count) in sorted_desc(&stats.pages_by_host) {
            println!("  - {} ({})", host, count);
        }
        println!();
    }

    if !stats.errors_by_code.is_empty() {
        println!("Error Summary:");
        for (code, count) in sorted_desc(&stats.errors_by_code) {
            println!("  {}: {}", code, count);
        }
        println!();
    }

    let attempted = stats.urls_fetched + stats.total_errors();
    let success_rate = if attempted > 0 {
        (stats.urls_fetched as f64 / attempted as f64) * 100.0
    } else {
        0.0
    };

    println!(
        "Success Rate: {:.1}% ({} / {} tasks produced a response)",
        success_rate, stats.urls_fetched, attempted
    );
}
