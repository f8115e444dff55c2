//! Configuration module for Ripple-Crawl
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Every key is optional; missing keys fall back to the crawler defaults.
//!
//! # Example
//!
//! ```no_run
//! use ripple_crawl::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("crawl.toml")).unwrap();
//! println!("Crawler will use {} connections", config.crawler.max_connections);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, CrawlerConfig, PolicyConfig, StoreConfig, StoreKind};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use validation::validate;
