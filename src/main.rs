//! Ripple-Crawl main entry point
//!
//! This is the command-line interface for the Ripple-Crawl engine.

use anyhow::Context;
use clap::Parser;
use ripple_crawl::config::{load_config_with_hash, Config, StoreKind};
use ripple_crawl::observer::{print_statistics, ConsoleObserver, StatsObserver};
use ripple_crawl::storage::open_store;
use ripple_crawl::Crawler;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Ripple-Crawl: a polite, resumable web crawler
///
/// Crawls outward from the configured seeds while respecting a concurrency
/// bound, per-host back-off, retry budgets, depth limits and duplicate
/// avoidance. With the sqlite store an interrupted run picks up where it
/// left off.
#[derive(Parser, Debug)]
#[command(name = "ripple-crawl")]
#[command(version)]
#[command(about = "A polite, resumable web crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Extra seed URL (repeatable), crawled alongside the configured seeds
    #[arg(long = "seed", value_name = "URL")]
    seeds: Vec<String>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Start a fresh crawl, discarding any stored state
    #[arg(long)]
    fresh: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    config.seeds.extend(cli.seeds.iter().cloned());

    if cli.dry_run {
        handle_dry_run(&config);
        return Ok(());
    }

    handle_crawl(config, &config_hash, cli.fresh).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("ripple_crawl=info,warn"),
            1 => EnvFilter::new("ripple_crawl=debug,info"),
            2 => EnvFilter::new("ripple_crawl=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: shows the effective configuration
fn handle_dry_run(config: &Config) {
    let crawler = &config.crawler;
    let policy = &config.policy;

    println!("=== Ripple-Crawl Dry Run ===\n");

    println!("Crawler Configuration:");
    println!(
        "  Max connections: {} (effective {})",
        crawler.max_connections,
        crawler.effective_connections()
    );
    println!("  Timeout: {}ms", crawler.timeout);
    println!("  Retries: {} (retry timeout {}ms)", crawler.retries, crawler.retry_timeout);
    println!("  Rate limits: {}ms", crawler.rate_limits);
    println!("  Max errors per host: {}", crawler.max_errors);
    println!("  Error rates: {:?}", crawler.error_rates);
    println!("  Depth limit: {}", crawler.depth_limit);
    println!("  Skip duplicates: {}", crawler.skip_duplicates);
    println!("  Follow redirects: {}", crawler.follow_redirect);
    println!("  Method: {}", crawler.method);
    println!("  User agent: {}", crawler.user_agent);
    if let Some(referer) = &crawler.referer {
        println!("  Referer: {}", referer);
    }

    println!("\nLink Policy:");
    println!("  External hosts: {}", policy.external_hosts);
    println!("  External domains: {}", policy.external_domains);
    println!("  First external link only: {}", policy.first_external_link_only);
    println!("  Protocols: {:?}", policy.protocols);
    println!("  Domain blacklist: {:?}", policy.domain_blacklist);
    println!("  Suffix blacklist: {:?}", policy.suffix_blacklist);
    println!(
        "  Extract: link tags {} {:?}, scripts {}, images {}",
        policy.links, policy.link_types, policy.scripts, policy.images
    );

    println!("\nStore:");
    match config.store.kind {
        StoreKind::Memory => println!("  Kind: memory"),
        StoreKind::Sqlite => println!("  Kind: sqlite ({})", config.store.path),
    }

    println!("\nProxies ({}):", config.proxies.len());
    for proxy in &config.proxies {
        println!("  - {}", proxy);
    }

    println!("\nSeeds ({}):", config.seeds.len());
    for seed in &config.seeds {
        println!("  - {}", seed);
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config, config_hash: &str, fresh: bool) -> anyhow::Result<()> {
    let session = open_store(&config.store, config_hash, fresh)
        .with_context(|| format!("failed to open {:?} store", config.store.kind))?;

    let stats = Arc::new(StatsObserver::new());
    let seeds = config.seeds.clone();
    tracing::info!("Total seed URLs: {}", seeds.len());

    let crawler = Crawler::builder(config)
        .store(session.store())
        .observer(Arc::new(ConsoleObserver::new()))
        .observer(stats.clone())
        .build();

    let started = std::time::Instant::now();
    if session.should_resume() {
        let resumed = crawler.crawl_resumed(seeds).await;
        if resumed > 0 {
            tracing::info!("Resumed {} interrupted URLs", resumed);
        }
    } else {
        crawler.crawl(seeds).await;
    }

    session.finish()?;

    tracing::info!(
        "Crawl completed in {:?} (peak concurrency {})",
        started.elapsed(),
        crawler.peak_concurrency()
    );
    print_statistics(&stats.snapshot());

    Ok(())
}
