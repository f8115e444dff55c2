//! One line per fetch or error on stdout

use crate::crawler::ParsedPage;
use crate::observer::{CrawlFailure, CrawlResult, ErrorContext, Observer};
use async_trait::async_trait;
use url::Url;

/// Observer that echoes fetches, errors and redirects to the console
#[derive(Debug, Default)]
pub struct ConsoleObserver;

impl ConsoleObserver {
    pub fn new() -> Self {
        Self
    }
}

pub(crate) fn fetch_line(result: &CrawlResult) -> String {
    format!(
        "{} {} {} ({} ms){}",
        result.status_code(),
        result.response.method,
        result.url(),
        result.response.response_time.as_millis(),
        result
            .response
            .proxy
            .as_deref()
            .map(|p| format!(" via {}", p))
            .unwrap_or_default()
    )
}

pub(crate) fn error_line(error: &CrawlFailure, context: &ErrorContext) -> String {
    format!(
        "ERR {} {} {} [{}/{}]: {}",
        error.code(),
        context.method,
        context.url,
        context.current_retries,
        context.max_retries,
        error
    )
}

#[async_trait]
impl Observer for ConsoleObserver {
    async fn on_fetch(&self, result: &CrawlResult, _page: Option<&ParsedPage>) {
        println!("{}", fetch_line(result));
    }

    async fn on_error(&self, error: &CrawlFailure, context: &ErrorContext) {
        println!("{}", error_line(error, context));
    }

    async fn on_redirect(&self, from: &Url, to: &Url, status_code: u16) {
        println!("{} {} -> {}", status_code, from, to);
    }
}
