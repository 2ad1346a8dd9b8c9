//! Crawl workers
//!
//! Each worker loops: take the next entry from the scheduler, fetch it, hand
//! the document to the extractor, push discovered links back into the
//! frontier and append records to the sink. Per-URL errors are counted and
//! logged; they never end the loop.

use crate::crawler::classifier::{Tier, TierClassifier};
use crate::crawler::extractor::{DiscoveredLink, Extractor};
use crate::crawler::fetcher::{Document, FetchOutcome, Fetcher, SkipReason};
use crate::crawler::frontier::{Frontier, FrontierEntry};
use crate::crawler::scheduler::Scheduler;
use crate::crawler::sink::ResultSink;
use crate::state::CrawlCounters;
use crate::url::{dedup_key, resolve_link, Scope};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use url::Url;

/// How often, in completed pages, a progress line is logged
const PROGRESS_EVERY: u64 = 10;

/// Shared state of one crawl run
///
/// Workers hold an `Arc` to this; none of them owns any part of it.
pub struct CrawlContext {
    pub frontier: Frontier,
    pub scheduler: Scheduler,
    pub sink: ResultSink,
    pub counters: CrawlCounters,
    pub fetcher: Arc<dyn Fetcher>,
    pub extractor: Arc<dyn Extractor>,
    pub classifier: Arc<dyn TierClassifier>,
    pub scope: Scope,
    pub started: Instant,
    processed: AtomicU64,
}

impl CrawlContext {
    pub fn new(
        scheduler: Scheduler,
        fetcher: Arc<dyn Fetcher>,
        extractor: Arc<dyn Extractor>,
        classifier: Arc<dyn TierClassifier>,
        scope: Scope,
    ) -> Self {
        Self {
            frontier: Frontier::new(),
            scheduler,
            sink: ResultSink::new(),
            counters: CrawlCounters::new(),
            fetcher,
            extractor,
            classifier,
            scope,
            started: Instant::now(),
            processed: AtomicU64::new(0),
        }
    }

    /// Tier for a link: the classifier's verdict, promoted by any hint
    pub fn tier_for(&self, url: &Url, hint: Option<Tier>) -> Tier {
        let tier = self.classifier.classify(url.as_str());
        match hint {
            Some(hint) => tier.max(hint),
            None => tier,
        }
    }
}

/// Marks a dispatched entry complete when dropped, even on panic
struct InFlight<'a>(&'a Scheduler);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.complete();
    }
}

/// Runs one worker until the scheduler stops handing out work
pub async fn run_worker(id: usize, ctx: Arc<CrawlContext>) {
    tracing::debug!("Worker {} started", id);
    let mut handled = 0u64;

    while let Some(entry) = ctx.scheduler.next(&ctx.frontier).await {
        let _in_flight = InFlight(&ctx.scheduler);
        process_entry(&ctx, entry).await;
        handled += 1;
        report_progress(&ctx);
    }

    tracing::debug!("Worker {} finished after {} URLs", id, handled);
}

async fn process_entry(ctx: &CrawlContext, entry: FrontierEntry) {
    ctx.counters.record_attempt();
    tracing::debug!("Fetching [{}] {}", entry.tier, entry.url);

    match ctx
        .fetcher
        .fetch(&entry.url, ctx.scheduler.cancel_token())
        .await
    {
        FetchOutcome::Success(document) => handle_document(ctx, &entry, document),
        FetchOutcome::Skipped(SkipReason::NotFound) => {
            tracing::info!("Skipping {}: not found", entry.url);
            ctx.counters.record_skip();
        }
        FetchOutcome::Skipped(SkipReason::Cancelled) => {
            tracing::debug!("Fetch of {} cancelled", entry.url);
            ctx.counters.record_cancelled();
        }
        FetchOutcome::Failed(e) => {
            tracing::warn!("Failed to fetch {}: {}", entry.url, e);
            ctx.counters.record_failure();
        }
    }
}

fn handle_document(ctx: &CrawlContext, entry: &FrontierEntry, document: Document) {
    let source = document.url.clone();

    let extraction = match ctx.extractor.extract(&document, &source) {
        Ok(extraction) => extraction,
        Err(e) => {
            tracing::warn!("Extraction failed for {}: {}", entry.url, e);
            ctx.counters.record_extract_error();
            return;
        }
    };

    // Visited before links go in, so self-links and the redirect target are not re-queued
    let mut first = ctx.frontier.mark_visited(&entry.key);
    let final_key = dedup_key(&source);
    if final_key != entry.key {
        tracing::debug!("{} redirected to {}", entry.url, source);
        first &= ctx.frontier.mark_visited(&final_key);
    }

    if !first {
        tracing::debug!("Discarding {}: {} was already extracted", entry.url, source);
        ctx.counters.record_duplicate();
        return;
    }

    let pushed = enqueue_links(ctx, &source, extraction.links);

    let mut records = extraction.records;
    for record in &mut records {
        if record.source_url.is_empty() {
            record.source_url = source.to_string();
        }
    }
    let count = ctx.sink.append(records);

    ctx.counters.record_success(count as u64);
    tracing::debug!(
        "Processed {}: {} records, {} new links",
        entry.url,
        count,
        pushed
    );

    if pushed > 0 {
        ctx.scheduler.notify_work();
    }
}

/// Resolves, scopes, classifies and pushes discovered links
///
/// Returns how many were new to the frontier.
fn enqueue_links(ctx: &CrawlContext, base: &Url, links: Vec<DiscoveredLink>) -> usize {
    let mut pushed = 0;

    for link in links {
        let Some(url) = resolve_link(&link.href, base) else {
            continue;
        };

        if !ctx.scope.contains(&url) {
            tracing::trace!("Out of scope: {}", url);
            continue;
        }

        let tier = ctx.tier_for(&url, link.tier_hint);
        if ctx.frontier.push(url, tier) {
            pushed += 1;
        }
    }

    pushed
}

fn report_progress(ctx: &CrawlContext) {
    let done = ctx.processed.fetch_add(1, Ordering::Relaxed) + 1;
    if done % PROGRESS_EVERY != 0 {
        return;
    }

    let elapsed = ctx.started.elapsed().as_secs_f64();
    let rate = if elapsed > 0.0 {
        done as f64 / elapsed
    } else {
        0.0
    };
    let (high, low) = ctx.frontier.tier_lengths();
    tracing::info!(
        "Progress: {} pages completed, {} in frontier ({} high, {} low), {:.2} pages/sec",
        done,
        high + low,
        high,
        low,
        rate
    );
}
