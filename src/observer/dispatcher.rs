//! Fan-out of lifecycle events to observers
//!
//! Each event is delivered to every observer concurrently and the call
//! returns only once all of them have returned. A hung observer therefore
//! stalls the task that raised the event, and nothing else.

use crate::crawler::ParsedPage;
use crate::observer::{CrawlFailure, CrawlResult, ErrorContext, Observer};
use futures::future::join_all;
use std::sync::Arc;
use url::Url;

#[derive(Clone, Default)]
pub struct Dispatcher {
    observers: Vec<Arc<dyn Observer>>,
}

impl Dispatcher {
    pub fn new(observers: Vec<Arc<dyn Observer>>) -> Self {
        Self { observers }
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    pub async fn fetch(&self, result: &CrawlResult, page: Option<&ParsedPage>) {
        join_all(self.observers.iter().map(|o| o.on_fetch(result, page))).await;
    }

    pub async fn error(&self, error: &CrawlFailure, context: &ErrorContext) {
        join_all(self.observers.iter().map(|o| o.on_error(error, context))).await;
    }

    pub async fn link_discovered(&self, page: &Url, link: &Url, anchor: &str, is_do_follow: bool) {
        join_all(
            self.observers
                .iter()
                .map(|o| o.on_link_discovered(page, link, anchor, is_do_follow)),
        )
        .await;
    }

    pub async fn image_discovered(&self, page: &Url, link: &Url, alt: &str) {
        join_all(
            self.observers
                .iter()
                .map(|o| o.on_image_discovered(page, link, alt)),
        )
        .await;
    }

    pub async fn redirect(&self, from: &Url, to: &Url, status_code: u16) {
        join_all(self.observers.iter().map(|o| o.on_redirect(from, to, status_code))).await;
    }

    pub async fn link_rejected(&self, page: &Url, link: &Url, anchor: &str, is_do_follow: bool) {
        join_all(
            self.observers
                .iter()
                .map(|o| o.on_link_rejected(page, link, anchor, is_do_follow)),
        )
        .await;
    }

    pub async fn retry_scheduled(&self, error: &CrawlFailure, context: &ErrorContext) {
        join_all(
            self.observers
                .iter()
                .map(|o| o.on_retry_scheduled(error, context)),
        )
        .await;
    }
}
