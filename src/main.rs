//! Tidemark main entry point
//!
//! This is the command-line interface for the Tidemark site crawler.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tidemark::config::{load_config_with_hash, validate, Config};
use tidemark::crawler::build_coordinator;
use tidemark::output::{print_statistics, JsonOutputHandler, OutputHandler};
use tracing_subscriber::EnvFilter;

/// Tidemark: a bounded, prioritized site crawler
///
/// Tidemark crawls a bounded region of a website with a pool of concurrent
/// workers, fetches paginated listings before detail pages, and extracts
/// structured records with CSS selectors.
#[derive(Parser, Debug)]
#[command(name = "tidemark")]
#[command(version)]
#[command(about = "A bounded, prioritized site crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long)]
    dry_run: bool,

    /// Override the number of concurrent workers
    #[arg(long, value_name = "N")]
    workers: Option<usize>,

    /// Override the crawl budget (maximum pages fetched)
    #[arg(long, value_name = "N")]
    max_pages: Option<u64>,

    /// Override the JSON records output path
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    apply_overrides(&mut config, &cli);
    validate(&config).context("Invalid command-line override")?;

    if cli.dry_run {
        handle_dry_run(&config);
        return Ok(());
    }

    handle_crawl(config, config_hash).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("tidemark=info,warn"),
            1 => EnvFilter::new("tidemark=debug,info"),
            2 => EnvFilter::new("tidemark=trace,debug"),
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

fn apply_overrides(config: &mut Config, cli: &Cli) {
    if let Some(workers) = cli.workers {
        config.crawler.workers = workers;
    }
    if let Some(max_pages) = cli.max_pages {
        config.crawler.max_pages = Some(max_pages);
    }
    if let Some(output) = &cli.output {
        config.output.records_path = Some(output.display().to_string());
    }
}

/// Handles the --dry-run mode: validates config and shows what would be crawled
fn handle_dry_run(config: &Config) {
    println!("=== Tidemark Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Workers: {}", config.crawler.workers);
    match config.crawler.max_pages {
        Some(max) => println!("  Max pages: {}", max),
        None => println!("  Max pages: unbounded"),
    }

    println!("\nStart URLs ({}):", config.crawler.start_urls.len());
    for seed in &config.crawler.start_urls {
        println!("  * {}", seed);
    }

    if config.crawler.allowed_domains.is_empty() && config.crawler.allowed_prefixes.is_empty() {
        println!("\nScope: hosts of the start URLs");
    } else {
        println!("\nScope:");
        for domain in &config.crawler.allowed_domains {
            println!("  - domain {}", domain);
        }
        for prefix in &config.crawler.allowed_prefixes {
            println!("  - prefix {}", prefix);
        }
    }

    println!("\nFetcher:");
    println!("  Timeout: {}s", config.fetcher.timeout_secs);
    println!("  Max retries: {}", config.fetcher.max_retries);
    println!(
        "  Backoff: {:?}, base {}ms",
        config.fetcher.backoff, config.fetcher.backoff_base_ms
    );
    println!("  User agent: {}", config.fetcher.user_agent);

    println!(
        "\nHigh-priority patterns ({}):",
        config.classifier.high_priority.len()
    );
    for pattern in &config.classifier.high_priority {
        println!("  - {}", pattern);
    }

    println!("\nExtraction:");
    match &config.extract.page_pattern {
        Some(pattern) => println!("  Pages: {}", pattern),
        None => println!("  Pages: all"),
    }
    if let Some(item) = &config.extract.item_selector {
        println!("  Items: {}", item);
    }
    for (name, selector) in &config.extract.fields {
        println!("  Field {} = {}", name, selector);
    }

    if let Some(path) = &config.output.records_path {
        println!("\nOutput: {}", path);
    }

    println!("\n✓ Configuration is valid");
    println!(
        "✓ Would start crawling with {} seed URLs",
        config.crawler.start_urls.len()
    );
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config, config_hash: String) -> Result<()> {
    let coordinator = build_coordinator(&config)
        .context("Failed to set up crawler")?
        .with_config_hash(config_hash);

    let cancel = coordinator.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, finishing in-flight pages");
            cancel.cancel();
        }
    });

    let report = match coordinator.run().await {
        Ok(report) => report,
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            return Err(e.into());
        }
    };

    print_statistics(&report.statistics);

    if let Some(path) = &config.output.records_path {
        let handler = JsonOutputHandler::new(path);
        handler
            .write_report(&report)
            .with_context(|| format!("Failed to write {}", handler.describe()))?;
        println!("\n✓ Records exported to: {}", path);
    }

    Ok(())
}
