//! The per-task unit of work
//!
//! One execution is one attempt: blacklist check, host gating and pacing,
//! fetch, then either a retry, a redirect, or result delivery followed by
//! link analysis. Retries and redirect targets go back through admission as
//! new tasks, so they wait for a slot like any other work.

use crate::crawler::depth::{inherit_depth, DepthPolicy};
use crate::crawler::fetcher::{FetchRequest, FetchResponse, Fetcher};
use crate::crawler::parser::{looks_like_html, parse_html, Discovered, ParsedPage};
use crate::crawler::policy::{evaluate, is_domain_blacklisted};
use crate::crawler::proxy::ProxyRotator;
use crate::crawler::rate_control::{Gate, HostErrorController};
use crate::crawler::redirect::follow_redirect;
use crate::crawler::scheduler::{TaskHandler, TaskQueue};
use crate::crawler::task::CrawlTask;
use crate::observer::{CrawlFailure, CrawlResult, Dispatcher, ErrorContext, StopReason};
use crate::state::Escalation;
use crate::storage::{CrawlStore, StoreError};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, error, warn};
use url::Url;

fn store_failure(err: StoreError) -> CrawlFailure {
    error!(error = %err, "Store operation failed; abandoning task");
    CrawlFailure::StopCrawl(StopReason::Store(err.to_string()))
}

/// Everything a task needs while it runs
pub struct Pipeline {
    store: Arc<dyn CrawlStore>,
    fetcher: Arc<dyn Fetcher>,
    dispatcher: Dispatcher,
    controller: HostErrorController,
    proxies: ProxyRotator,
    depth_policy: Arc<dyn DepthPolicy>,
}

impl Pipeline {
    pub fn new(
        store: Arc<dyn CrawlStore>,
        fetcher: Arc<dyn Fetcher>,
        dispatcher: Dispatcher,
        proxies: ProxyRotator,
        depth_policy: Arc<dyn DepthPolicy>,
    ) -> Self {
        Self {
            store,
            fetcher,
            dispatcher,
            controller: HostErrorController::new(),
            proxies,
            depth_policy,
        }
    }

    pub fn store(&self) -> &Arc<dyn CrawlStore> {
        &self.store
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Claims the task's URL (when deduplicating) and queues it
    ///
    /// Returns `false` if the URL was already claimed.
    pub async fn admit(
        &self,
        task: CrawlTask,
        queue: &TaskQueue<CrawlTask>,
    ) -> Result<bool, CrawlFailure> {
        if task.options.skip_duplicates {
            let already = self
                .store
                .check_and_mark_history(task.url.as_str())
                .await
                .map_err(store_failure)?;
            if already {
                debug!(url = %task.url, "Skipping duplicate");
                return Ok(false);
            }
        }

        debug!(url = %task.url, "Queued");
        queue.push(task);
        Ok(true)
    }

    async fn report(&self, error: &CrawlFailure, task: &CrawlTask, proxy: Option<&str>) {
        let context = ErrorContext::for_task(task, proxy);
        self.dispatcher.error(error, &context).await;
    }

    async fn complete(&self, task: &CrawlTask) {
        if let Err(err) = self.store.mark_completed(task.url.as_str()).await {
            error!(url = %task.url, error = %err, "Failed to mark task completed");
        }
    }

    async fn run(&self, mut task: CrawlTask, queue: &TaskQueue<CrawlTask>) {
        if is_domain_blacklisted(&task.url, &task.options) {
            debug!(url = %task.url, "Domain blacklisted");
            self.report(&CrawlFailure::DomainBlacklisted(task.url.to_string()), &task, None)
                .await;
            self.complete(&task).await;
            return;
        }

        match self.controller.gate(self.store.as_ref(), &task).await {
            Ok(Gate::Stopped) => {
                let host = task.host().unwrap_or_default();
                debug!(url = %task.url, host = %host, "Host stopped");
                self.report(&CrawlFailure::StopCrawl(StopReason::HostStopped(host)), &task, None)
                    .await;
                self.complete(&task).await;
                return;
            }
            Ok(Gate::Proceed(Some(delay))) => {
                debug!(url = %task.url, delay_ms = delay.as_millis() as u64, "Delaying request");
                tokio::time::sleep(delay).await;
            }
            Ok(Gate::Proceed(None)) => {}
            Err(err) => {
                self.report(&store_failure(err), &task, None).await;
                return;
            }
        }

        let proxy = self.proxies.next_or(task.options.proxy.as_deref());
        let request = FetchRequest {
            url: task.url.clone(),
            method: task.options.method.clone(),
            user_agent: task.options.user_agent.clone(),
            referer: task.options.referer.clone(),
            proxy: proxy.clone(),
            timeout: task.options.timeout,
            follow_redirect: task.options.follow_redirect,
        };

        debug!(url = %task.url, attempt = task.current_retries + 1, "Fetching");
        match self.fetcher.fetch(&request).await {
            Ok(response) => self.on_response(task, response, queue).await,
            Err(err) => {
                let retryable = err.is_retryable();
                let failure = CrawlFailure::Transport(err);

                if retryable {
                    let escalation = self
                        .controller
                        .record_error(self.store.as_ref(), &mut task)
                        .await;
                    match escalation {
                        Ok(Escalation::Stopped) => {}
                        Ok(_) if task.can_retry() => {
                            self.retry(task, failure, proxy.as_deref(), queue).await;
                            return;
                        }
                        Ok(_) => {}
                        Err(err) => {
                            self.report(&store_failure(err), &task, proxy.as_deref())
                                .await;
                            return;
                        }
                    }
                }

                warn!(url = %task.url, error = %failure, "Request failed");
                self.report(&failure, &task, proxy.as_deref()).await;
                self.complete(&task).await;
            }
        }
    }

    async fn retry(
        &self,
        mut task: CrawlTask,
        failure: CrawlFailure,
        proxy: Option<&str>,
        queue: &TaskQueue<CrawlTask>,
    ) {
        warn!(
            url = %task.url,
            error = %failure,
            retry = task.current_retries + 1,
            max_retries = task.max_retries,
            "Scheduling retry"
        );

        let context = ErrorContext::for_task(&task, proxy);
        self.dispatcher.retry_scheduled(&failure, &context).await;

        if let Err(err) = self.store.remove_from_history(task.url.as_str()).await {
            self.report(&store_failure(err), &task, proxy).await;
            return;
        }

        task.current_retries += 1;
        if let Err(failure) = self.admit(task.clone(), queue).await {
            self.report(&failure, &task, proxy).await;
        }
    }

    async fn on_response(&self, task: CrawlTask, response: FetchResponse, queue: &TaskQueue<CrawlTask>) {
        if response.is_redirect() && !task.options.follow_redirect {
            match follow_redirect(self.store.as_ref(), &self.dispatcher, &task, &response).await {
                Ok(next) => {
                    if let Err(failure) = self.admit(next, queue).await {
                        self.report(&failure, &task, response.proxy.as_deref()).await;
                    }
                }
                Err(failure) => {
                    self.report(&failure, &task, response.proxy.as_deref()).await;
                }
            }
            self.complete(&task).await;
            return;
        }

        let page_url = response.url.clone();
        if page_url != task.url {
            if let Err(err) = inherit_depth(self.store.as_ref(), task.url.as_str(), page_url.as_str()).await {
                self.report(&store_failure(err), &task, response.proxy.as_deref())
                    .await;
                return;
            }
        }

        let page = looks_like_html(&response.body).then(|| parse_html(&response.body, &page_url));
        let proxy = response.proxy.clone();
        let result = CrawlResult {
            response,
            task: task.clone(),
        };

        debug!(url = %task.url, status = result.status_code(), html = page.is_some(), "Fetched");
        self.dispatcher.fetch(&result, page.as_ref()).await;

        if let Some(page) = &page {
            if let Err(failure) = self.analyse_links(&task, &page_url, page, queue).await {
                self.report(&failure, &task, proxy.as_deref()).await;
                return;
            }
        }

        self.complete(&task).await;
    }

    /// Reports, evaluates and admits every target found on a page, in order
    async fn analyse_links(
        &self,
        task: &CrawlTask,
        page_url: &Url,
        page: &ParsedPage,
        queue: &TaskQueue<CrawlTask>,
    ) -> Result<(), CrawlFailure> {
        let options = &task.options;

        for item in page.discovered(options) {
            match &item {
                Discovered::Link {
                    url,
                    anchor,
                    is_do_follow,
                } => {
                    self.dispatcher
                        .link_discovered(page_url, url, anchor, *is_do_follow)
                        .await
                }
                Discovered::Image { url, alt } => {
                    self.dispatcher.image_discovered(page_url, url, alt).await
                }
            }

            let link = item.url();
            let depth = self
                .depth_policy
                .update_depth(self.store.as_ref(), page_url.as_str(), link.as_str())
                .await
                .map_err(store_failure)?;
            let origin = self
                .store
                .classify(page_url, link)
                .await
                .map_err(store_failure)?;
            let decision = evaluate(
                page_url,
                link,
                options,
                &origin,
                item.anchor(),
                item.is_do_follow(),
            );

            if decision.to_crawl && options.within_depth(depth) {
                self.admit(task.child(link.clone()), queue).await?;
            } else {
                debug!(
                    link = %link,
                    depth,
                    external = decision.is_external,
                    reason = ?decision.reason,
                    "Link rejected"
                );
                self.dispatcher
                    .link_rejected(page_url, link, item.anchor(), item.is_do_follow())
                    .await;
            }
        }

        Ok(())
    }
}

#[async_trait]
impl TaskHandler<CrawlTask> for Pipeline {
    async fn handle(&self, task: CrawlTask, queue: &TaskQueue<CrawlTask>) {
        self.run(task, queue).await
    }
}
