//! Redirect handling for unfollowed 3xx responses

use crate::crawler::depth::inherit_depth;
use crate::crawler::fetcher::FetchResponse;
use crate::crawler::task::CrawlTask;
use crate::observer::{CrawlFailure, Dispatcher, StopReason};
use crate::storage::CrawlStore;
use crate::url::resolve_link;
use tracing::debug;
use url::Url;

/// Resolves the `Location` of a 3xx response against the request URL
pub fn redirect_target(request_url: &Url, response: &FetchResponse) -> Result<Url, CrawlFailure> {
    let location = response
        .header("location")
        .filter(|l| !l.trim().is_empty())
        .ok_or_else(|| CrawlFailure::MissingLocation {
            url: request_url.to_string(),
            status: response.status_code,
        })?;

    resolve_link(request_url, location).ok_or_else(|| CrawlFailure::InvalidUrl {
        url: location.to_string(),
        reason: format!("unresolvable redirect from {}", request_url),
    })
}

/// Reports a redirect and builds the task for its target
///
/// The target sits at the depth of the redirecting URL and starts with a
/// fresh retry budget. Admission (and so deduplication) is left to the caller.
pub async fn follow_redirect(
    store: &dyn CrawlStore,
    dispatcher: &Dispatcher,
    task: &CrawlTask,
    response: &FetchResponse,
) -> Result<CrawlTask, CrawlFailure> {
    let target = redirect_target(&task.url, response)?;
    debug!(from = %task.url, to = %target, status = response.status_code, "Redirect discovered");

    dispatcher
        .redirect(&task.url, &target, response.status_code)
        .await;

    inherit_depth(store, task.url.as_str(), target.as_str())
        .await
        .map_err(|e| CrawlFailure::StopCrawl(StopReason::Store(e.to_string())))?;

    Ok(task.redirected(target))
}
