//! Link eligibility policy
//!
//! A pure decision over a discovered link: rules run in a fixed order and
//! the first failing rule rejects.

use crate::crawler::task::TaskOptions;
use crate::storage::OriginClassification;
use crate::url::{public_suffix, registrable_domain};
use url::Url;

/// Why a link was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    ExternalHost,
    ExternalDomain,
    NotFirstExternalLink,
    Protocol,
    DomainBlacklisted,
    SuffixBlacklisted,
    Predicate,
}

/// Outcome of evaluating one link
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PolicyDecision {
    pub to_crawl: bool,
    /// Link's registrable domain is not a start domain
    pub is_external: bool,
    pub reason: Option<RejectReason>,
}

impl PolicyDecision {
    fn accept(is_external: bool) -> Self {
        Self {
            to_crawl: true,
            is_external,
            reason: None,
        }
    }

    fn reject(is_external: bool, reason: RejectReason) -> Self {
        Self {
            to_crawl: false,
            is_external,
            reason: Some(reason),
        }
    }
}

/// Decides whether `link`, found on `parent`, may be crawled
pub fn evaluate(
    parent: &Url,
    link: &Url,
    options: &TaskOptions,
    origin: &OriginClassification,
    anchor: &str,
    is_do_follow: bool,
) -> PolicyDecision {
    let is_external = !origin.link_is_start_domain;

    // `external_hosts` opens every host; `external_domains` opens hosts off the start domains
    let opened_as_external_domain = !origin.link_is_start_domain && options.external_domains;
    if !origin.link_is_start_host && !options.external_hosts && !opened_as_external_domain {
        let reason = if origin.link_is_start_domain {
            RejectReason::ExternalHost
        } else {
            RejectReason::ExternalDomain
        };
        return PolicyDecision::reject(is_external, reason);
    }

    if options.first_external_link_only {
        let link_is_external = !origin.link_is_start_host || !origin.link_is_start_domain;
        if link_is_external && !origin.parent_is_start_host {
            return PolicyDecision::reject(is_external, RejectReason::NotFirstExternalLink);
        }
    }

    let scheme = link.scheme();
    if !options.protocols.iter().any(|p| p == scheme) {
        return PolicyDecision::reject(is_external, RejectReason::Protocol);
    }

    if let Some(domain) = registrable_domain(link) {
        if options.domain_blacklist.iter().any(|d| *d == domain) {
            return PolicyDecision::reject(is_external, RejectReason::DomainBlacklisted);
        }
    }

    if let Some(suffix) = public_suffix(link) {
        if options.suffix_blacklist.iter().any(|s| *s == suffix) {
            return PolicyDecision::reject(is_external, RejectReason::SuffixBlacklisted);
        }
    }

    if let Some(predicate) = &options.can_crawl {
        if !predicate.can_crawl(parent, link, anchor, is_do_follow) {
            return PolicyDecision::reject(is_external, RejectReason::Predicate);
        }
    }

    PolicyDecision::accept(is_external)
}

/// Returns true if the URL's registrable domain is blacklisted
pub fn is_domain_blacklisted(url: &Url, options: &TaskOptions) -> bool {
    registrable_domain(url).map_or(false, |domain| {
        options.domain_blacklist.iter().any(|d| *d == domain)
    })
}
