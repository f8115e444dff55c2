//! URL handling module for Ripple-Crawl
//!
//! Thin helpers over the `url` crate: normalization, resolution of links found
//! on a page, and the host / registrable-domain / public-suffix split used by
//! the link policy and the start-origin classification.

mod domain;
mod normalize;

pub use domain::{host, public_suffix, registrable_domain};
pub use normalize::{normalize_url, resolve_link};
