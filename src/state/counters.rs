use std::sync::atomic::{AtomicU64, Ordering};

/// Per-run outcome counters
///
/// Every URL handed to a worker bumps `attempted` exactly once and then
/// exactly one of the outcome counters, so the outcome counters always sum to
/// `attempted` once the run is drained.
#[derive(Debug, Default)]
pub struct CrawlCounters {
    attempted: AtomicU64,
    succeeded: AtomicU64,
    skipped: AtomicU64,
    failed: AtomicU64,
    extract_errors: AtomicU64,
    cancelled: AtomicU64,
    duplicates: AtomicU64,
    records: AtomicU64,
}

impl CrawlCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_attempt(&self) {
        self.attempted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_success(&self, records: u64) {
        self.succeeded.fetch_add(1, Ordering::Relaxed);
        self.records.fetch_add(records, Ordering::Relaxed);
    }

    /// Resource does not exist; terminal and not a failure
    pub fn record_skip(&self) {
        self.skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_extract_error(&self) {
        self.extract_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cancelled(&self) {
        self.cancelled.fetch_add(1, Ordering::Relaxed);
    }

    /// Fetched a document another URL already produced, e.g. through a redirect
    pub fn record_duplicate(&self) {
        self.duplicates.fetch_add(1, Ordering::Relaxed);
    }

    pub fn attempted(&self) -> u64 {
        self.attempted.load(Ordering::Relaxed)
    }

    pub fn succeeded(&self) -> u64 {
        self.succeeded.load(Ordering::Relaxed)
    }

    pub fn skipped(&self) -> u64 {
        self.skipped.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    pub fn extract_errors(&self) -> u64 {
        self.extract_errors.load(Ordering::Relaxed)
    }

    pub fn cancelled(&self) -> u64 {
        self.cancelled.load(Ordering::Relaxed)
    }

    pub fn duplicates(&self) -> u64 {
        self.duplicates.load(Ordering::Relaxed)
    }

    pub fn records(&self) -> u64 {
        self.records.load(Ordering::Relaxed)
    }

    /// Number of attempted URLs whose outcome has been recorded
    pub fn completed(&self) -> u64 {
        self.succeeded()
            + self.skipped()
            + self.failed()
            + self.extract_errors()
            + self.cancelled()
            + self.duplicates()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_counters_are_zero() {
        let counters = CrawlCounters::new();
        assert_eq!(counters.attempted(), 0);
        assert_eq!(counters.completed(), 0);
        assert_eq!(counters.records(), 0);
    }

    #[test]
    fn test_outcomes_sum_to_completed() {
        let counters = CrawlCounters::new();
        for _ in 0..7 {
            counters.record_attempt();
        }
        counters.record_success(3);
        counters.record_success(0);
        counters.record_skip();
        counters.record_failure();
        counters.record_extract_error();
        counters.record_cancelled();
        counters.record_duplicate();

        assert_eq!(counters.attempted(), 7);
        assert_eq!(counters.succeeded(), 2);
        assert_eq!(counters.skipped(), 1);
        assert_eq!(counters.failed(), 1);
        assert_eq!(counters.duplicates(), 1);
        assert_eq!(counters.records(), 3);
        assert_eq!(counters.completed(), counters.attempted());
    }
}
