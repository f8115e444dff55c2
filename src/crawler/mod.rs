//! Crawler module for web page fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - The bounded task queue and the per-task pipeline
//! - HTTP fetching, retries and per-host back-off
//! - HTML parsing, link policy and depth tracking
//! - The run context that ties them together

mod coordinator;
mod depth;
mod fetcher;
mod parser;
mod pipeline;
mod policy;
mod proxy;
mod rate_control;
mod redirect;
mod scheduler;
mod task;

pub use coordinator::{Crawler, CrawlerBuilder};
pub use depth::{inherit_depth, mark_seed, update_depth, DepthPolicy, FirstDiscovery, ShortestPath};
pub use fetcher::{build_http_client, FetchError, FetchRequest, FetchResponse, Fetcher, HttpFetcher};
pub use parser::{looks_like_html, parse_html, Anchor, Discovered, Image, LinkTag, ParsedPage};
pub use pipeline::Pipeline;
pub use policy::{evaluate, is_domain_blacklisted, PolicyDecision, RejectReason};
pub use proxy::ProxyRotator;
pub use rate_control::{Gate, HostErrorController};
pub use redirect::{follow_redirect, redirect_target};
pub use scheduler::{QueueHold, TaskHandler, TaskQueue};
pub use task::{CrawlPredicate, CrawlRequest, CrawlTask, QueueInput, TaskOptions};
