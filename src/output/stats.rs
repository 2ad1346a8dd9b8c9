//! Crawl statistics
//!
//! This module turns the live run counters into a serializable snapshot and
//! prints it for the operator.

use crate::state::CrawlCounters;
use serde::Serialize;
use std::time::Duration;

/// Crawl statistics summary
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CrawlStatistics {
    /// URLs handed to a worker
    pub attempted: u64,

    /// Fetched and extracted
    pub succeeded: u64,

    /// Not found; terminal but not a failure
    pub skipped: u64,

    /// Retries exhausted or request rejected
    pub failed: u64,

    /// Fetched but the extractor failed
    pub extract_errors: u64,

    /// Stopped by cancellation before completing
    pub cancelled: u64,

    /// Document was already extracted under another URL
    pub duplicates: u64,

    /// Records appended to the result sink
    pub records: u64,

    /// Distinct URLs discovered, including ones never fetched
    pub urls_seen: u64,

    /// Wall-clock duration of the run
    pub elapsed_secs: f64,
}

impl CrawlStatistics {
    /// Snapshots the counters of a run
    pub fn from_counters(counters: &CrawlCounters, urls_seen: usize, elapsed: Duration) -> Self {
        Self {
            attempted: counters.attempted(),
            succeeded: counters.succeeded(),
            skipped: counters.skipped(),
            failed: counters.failed(),
            extract_errors: counters.extract_errors(),
            cancelled: counters.cancelled(),
            duplicates: counters.duplicates(),
            records: counters.records(),
            urls_seen: urls_seen as u64,
            elapsed_secs: elapsed.as_secs_f64(),
        }
    }

    /// Attempted URLs per second of wall-clock time
    pub fn pages_per_sec(&self) -> f64 {
        if self.elapsed_secs > 0.0 {
            self.attempted as f64 / self.elapsed_secs
        } else {
            0.0
        }
    }

    /// Returns the success rate as a percentage of attempted URLs
    pub fn success_rate(&self) -> f64 {
        if self.attempted == 0 {
            return 0.0;
        }
        (self.succeeded as f64 / self.attempted as f64) * 100.0
    }
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &CrawlStatistics) {
    println!("=== Crawl Statistics ===\n");

    println!("Overview:");
    println!("  URLs discovered: {}", stats.urls_seen);
    println!("  URLs attempted: {}", stats.attempted);
    println!("  Records extracted: {}", stats.records);
    println!();

    println!("Outcomes:");
    println!("  Succeeded: {}", stats.succeeded);
    println!("  Skipped (not found): {}", stats.skipped);
    println!("  Failed (exhausted or rejected): {}", stats.failed);
    println!("  Extraction errors: {}", stats.extract_errors);
    if stats.duplicates > 0 {
        println!("  Duplicates (already extracted): {}", stats.duplicates);
    }
    if stats.cancelled > 0 {
        println!("  Cancelled: {}", stats.cancelled);
    }
    println!();

    println!(
        "Elapsed: {:.1}s ({:.2} pages/sec)",
        stats.elapsed_secs,
        stats.pages_per_sec()
    );
    println!(
        "Success Rate: {:.1}% ({} / {} URLs successfully processed)",
        stats.success_rate(),
        stats.succeeded,
        stats.attempted
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_counters() {
        let counters = CrawlCounters::new();
        for _ in 0..4 {
            counters.record_attempt();
        }
        counters.record_success(5);
        counters.record_success(2);
        counters.record_skip();
        counters.record_failure();

        let stats = CrawlStatistics::from_counters(&counters, 9, Duration::from_secs(2));
        assert_eq!(stats.attempted, 4);
        assert_eq!(stats.succeeded, 2);
        assert_eq!(stats.skipped, 1);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.records, 7);
        assert_eq!(stats.urls_seen, 9);
        assert!((stats.pages_per_sec() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_success_rate() {
        let stats = CrawlStatistics {
            attempted: 10,
            succeeded: 8,
            ..Default::default()
        };
        assert!((stats.success_rate() - 80.0).abs() < 0.01);
    }

    #[test]
    fn test_rates_with_nothing_attempted() {
        let stats = CrawlStatistics::default();
        assert_eq!(stats.success_rate(), 0.0);
        assert_eq!(stats.pages_per_sec(), 0.0);
    }
}
