//! Crawler module for web page fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - The two-tier frontier and its atomic seen-set
//! - HTTP fetching with retry logic and charset detection
//! - Record and link extraction
//! - Dispatch, budget and termination detection
//! - Overall crawl coordination

mod classifier;
mod coordinator;
mod encoding;
mod extractor;
mod fetcher;
mod frontier;
mod retry;
mod scheduler;
mod sink;
mod worker;

pub use classifier::{PatternClassifier, Tier, TierClassifier};
pub use coordinator::{build_coordinator, Coordinator, CrawlReport};
pub use encoding::{charset_from_content_type, decode_body, detect_encoding};
pub use extractor::{
    DiscoveredLink, ExtractError, Extraction, Extractor, LinkExtractor, Record, SelectorExtractor,
    SOURCE_URL_FIELD,
};
pub use fetcher::{
    build_http_client, header_map, Document, FetchError, FetchOutcome, Fetcher, HttpFetcher,
    SkipReason,
};
pub use frontier::{Frontier, FrontierEntry};
pub use retry::{Backoff, RetryPolicy};
pub use scheduler::Scheduler;
pub use sink::ResultSink;

use crate::config::Config;
use crate::CrawlError;

/// Runs a complete crawl operation
///
/// This is the main entry point for a configured crawl. It will:
/// 1. Build the HTTP fetcher, extractor and classifier from configuration
/// 2. Seed the frontier with the start URLs
/// 3. Run the worker pool until the frontier drains or the budget is spent
/// 4. Return the report with all extracted records
///
/// # Arguments
///
/// * `config` - The crawler configuration
/// * `config_hash` - Hash of the configuration file, carried into the report
///
/// # Returns
///
/// * `Ok(CrawlReport)` - Crawl reached `Done`
/// * `Err(CrawlError)` - Configuration was invalid or a worker task failed
pub async fn crawl(config: &Config, config_hash: Option<String>) -> Result<CrawlReport, CrawlError> {
    let mut coordinator = build_coordinator(config)?;
    if let Some(hash) = config_hash {
        coordinator = coordinator.with_config_hash(hash);
    }
    coordinator.run().await
}
