//! Crawler coordinator - main crawl orchestration logic
//!
//! This module owns the lifetime of one crawl run, including:
//! - Validating the run parameters and seeding the frontier
//! - Spawning the worker pool and waiting for it to drain
//! - Driving the phase machine to `Done`
//! - Assembling the final report

use crate::config::{Config, CrawlerConfig};
use crate::crawler::classifier::{PatternClassifier, TierClassifier};
use crate::crawler::extractor::{Extractor, Record, SelectorExtractor};
use crate::crawler::fetcher::{Fetcher, HttpFetcher};
use crate::crawler::frontier::Frontier;
use crate::crawler::scheduler::Scheduler;
use crate::crawler::worker::{run_worker, CrawlContext};
use crate::output::CrawlStatistics;
use crate::state::CrawlPhase;
use crate::url::{normalize_parsed, Scope};
use crate::{ConfigError, CrawlError};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Everything a finished crawl produced
#[derive(Debug, Clone, Serialize)]
pub struct CrawlReport {
    /// Always `Done` for a report returned by [`Coordinator::run`]
    pub phase: CrawlPhase,

    pub statistics: CrawlStatistics,

    /// Extracted records in completion order
    pub records: Vec<Record>,

    /// Dedup keys of every visited URL, sorted
    pub visited: Vec<String>,

    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,

    /// SHA-256 of the configuration file, when the run was configured from one
    pub config_hash: Option<String>,
}

/// Main crawler coordinator structure
pub struct Coordinator {
    ctx: CrawlContext,
    workers: usize,
    seeds: Vec<Url>,
    config_hash: Option<String>,
}

impl Coordinator {
    /// Creates a coordinator and seeds the frontier
    ///
    /// Fails with a configuration error, before any network activity, when
    /// there are no workers or a start URL is not an absolute http(s) URL.
    ///
    /// # Arguments
    ///
    /// * `config` - Worker count, budget, start URLs and scope
    /// * `fetcher` - Retrieves documents
    /// * `extractor` - Turns documents into records and links
    /// * `classifier` - Assigns a priority tier to each URL
    pub fn new(
        config: &CrawlerConfig,
        fetcher: Arc<dyn Fetcher>,
        extractor: Arc<dyn Extractor>,
        classifier: Arc<dyn TierClassifier>,
    ) -> Result<Self, CrawlError> {
        if config.workers == 0 {
            return Err(ConfigError::Validation("workers must be >= 1".to_string()).into());
        }

        if config.max_pages == Some(0) {
            return Err(
                ConfigError::Validation("max-pages must be >= 1 when set".to_string()).into(),
            );
        }

        if config.start_urls.is_empty() {
            return Err(
                ConfigError::Validation("at least one start URL is required".to_string()).into(),
            );
        }

        let seeds = config
            .start_urls
            .iter()
            .map(|s| parse_seed(s))
            .collect::<Result<Vec<_>, _>>()?;

        let scope = Scope::new(&config.allowed_domains, &config.allowed_prefixes, &seeds)?;
        let scheduler = Scheduler::new(config.max_pages, CancellationToken::new());
        let ctx = CrawlContext::new(scheduler, fetcher, extractor, classifier, scope);

        for seed in &seeds {
            let tier = ctx.classifier.classify(seed.as_str());
            if !ctx.frontier.push(seed.clone(), tier) {
                tracing::debug!("Duplicate start URL ignored: {}", seed);
            }
        }

        Ok(Self {
            ctx,
            workers: config.workers,
            seeds,
            config_hash: None,
        })
    }

    /// Attaches the configuration hash carried into the report
    pub fn with_config_hash(mut self, hash: impl Into<String>) -> Self {
        self.config_hash = Some(hash.into());
        self
    }

    /// Token that stops the crawl when cancelled
    ///
    /// Cancelling moves a running crawl to `Draining`: no new URLs are
    /// dispatched, backoff sleeps end early, and fetches already on the wire
    /// finish.
    pub fn cancel_token(&self) -> CancellationToken {
        self.ctx.scheduler.cancel_token().clone()
    }

    pub fn phase(&self) -> CrawlPhase {
        self.ctx.scheduler.phase()
    }

    pub fn frontier(&self) -> &Frontier {
        &self.ctx.frontier
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Runs the crawl to completion
    ///
    /// Returns once every worker has exited. A worker that panics does not
    /// stop the others from finishing their in-flight pages, but the run then
    /// ends with [`CrawlError::Worker`] instead of a report.
    pub async fn run(self) -> Result<CrawlReport, CrawlError> {
        let started_at = Utc::now();
        let Self {
            ctx,
            workers,
            seeds,
            config_hash,
        } = self;
        let ctx = Arc::new(ctx);

        if ctx.scheduler.cancel_token().is_cancelled() {
            ctx.scheduler.begin_draining("stop requested before start");
        } else {
            ctx.scheduler.transition(CrawlPhase::Running)?;
            tracing::info!(
                "Starting crawl: {} seed URLs, {} workers, budget {}",
                seeds.len(),
                workers,
                ctx.scheduler
                    .max_pages()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| "unbounded".to_string())
            );
        }

        let mut pool = JoinSet::new();
        if ctx.scheduler.phase() == CrawlPhase::Running {
            for id in 0..workers {
                pool.spawn(run_worker(id, Arc::clone(&ctx)));
            }
        }

        let mut failure = None;
        while let Some(joined) = pool.join_next().await {
            if let Err(e) = joined {
                tracing::error!("Worker task failed: {}", e);
                ctx.scheduler.begin_draining("worker failed");
                failure.get_or_insert(e);
            }
        }

        ctx.scheduler.begin_draining("all workers exited");
        ctx.scheduler.transition(CrawlPhase::Done)?;

        if let Some(e) = failure {
            return Err(CrawlError::Worker(e));
        }

        let statistics = CrawlStatistics::from_counters(
            &ctx.counters,
            ctx.frontier.seen_count(),
            ctx.started.elapsed(),
        );

        tracing::info!(
            "Crawl completed: {} attempted, {} succeeded, {} skipped, {} failed, {} records in {:.1}s",
            statistics.attempted,
            statistics.succeeded,
            statistics.skipped,
            statistics.failed,
            statistics.records,
            statistics.elapsed_secs
        );

        Ok(CrawlReport {
            phase: ctx.scheduler.phase(),
            statistics,
            records: ctx.sink.drain(),
            visited: ctx.frontier.visited(),
            started_at,
            finished_at: Utc::now(),
            config_hash,
        })
    }
}

/// Parses a start URL, keeping it as written apart from the fragment
fn parse_seed(seed: &str) -> Result<Url, ConfigError> {
    let mut url = Url::parse(seed.trim())
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid start URL '{}': {}", seed, e)))?;

    normalize_parsed(url.clone())
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid start URL '{}': {}", seed, e)))?;

    url.set_fragment(None);
    Ok(url)
}

/// Builds a coordinator with the HTTP fetcher and configured extractor
///
/// The caller keeps the coordinator's cancel token to stop the crawl.
pub fn build_coordinator(config: &Config) -> Result<Coordinator, CrawlError> {
    let fetcher = HttpFetcher::new(&config.fetcher)?;
    let extractor = SelectorExtractor::from_config(&config.extract)?;
    let classifier = PatternClassifier::new(&config.classifier.high_priority)?;

    Coordinator::new(
        &config.crawler,
        Arc::new(fetcher),
        Arc::new(extractor),
        Arc::new(classifier),
    )
}
