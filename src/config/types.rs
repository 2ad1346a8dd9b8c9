use crate::crawler::{Backoff, RetryPolicy};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;

/// Main configuration structure for Tidemark
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub fetcher: FetcherConfig,
    #[serde(default)]
    pub classifier: ClassifierConfig,
    #[serde(default)]
    pub extract: ExtractConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Crawl size, concurrency and boundaries
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CrawlerConfig {
    /// Number of concurrent workers
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Maximum number of fetches dispatched; absent means unbounded
    #[serde(default)]
    pub max_pages: Option<u64>,

    /// URLs the crawl starts from
    pub start_urls: Vec<String>,

    /// Host patterns (e.g., "example.com" or "*.example.com") links must match
    #[serde(default)]
    pub allowed_domains: Vec<String>,

    /// URL prefixes links must start with
    #[serde(default)]
    pub allowed_prefixes: Vec<String>,
}

impl CrawlerConfig {
    /// Unbounded crawl over the given seeds with default worker count
    pub fn new<S: Into<String>>(start_urls: impl IntoIterator<Item = S>) -> Self {
        Self {
            workers: default_workers(),
            max_pages: None,
            start_urls: start_urls.into_iter().map(Into::into).collect(),
            allowed_domains: Vec::new(),
            allowed_prefixes: Vec::new(),
        }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_max_pages(mut self, max_pages: u64) -> Self {
        self.max_pages = Some(max_pages);
        self
    }
}

/// HTTP client and retry configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct FetcherConfig {
    /// Whole-request timeout in seconds
    pub timeout_secs: u64,

    /// Connection timeout in seconds
    pub connect_timeout_secs: u64,

    /// Retries after the initial attempt
    pub max_retries: u32,

    pub backoff: Backoff,

    /// Backoff base multiplier in milliseconds
    pub backoff_base_ms: u64,

    /// Upper bound on a single backoff delay in milliseconds
    pub backoff_max_ms: Option<u64>,

    pub user_agent: String,

    /// Extra request headers sent with every request
    pub headers: BTreeMap<String, String>,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 15,
            connect_timeout_secs: 10,
            max_retries: 3,
            backoff: Backoff::Exponential,
            backoff_base_ms: 1000,
            backoff_max_ms: Some(5000),
            user_agent: format!("tidemark/{}", env!("CARGO_PKG_VERSION")),
            headers: BTreeMap::new(),
        }
    }
}

impl FetcherConfig {
    /// Builds the retry policy described by this section
    pub fn retry_policy(&self) -> RetryPolicy {
        let policy = RetryPolicy::new(
            self.max_retries,
            Duration::from_millis(self.backoff_base_ms),
            self.backoff,
        );
        match self.backoff_max_ms {
            Some(max) => policy.with_max_delay(Duration::from_millis(max)),
            None => policy,
        }
    }
}

/// URL-shape priority rules
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct ClassifierConfig {
    /// Regexes; a URL matching any of them is high priority
    pub high_priority: Vec<String>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            high_priority: vec![r"/page/\d+/".to_string()],
        }
    }
}

/// Record extraction rules
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct ExtractConfig {
    /// Only pages whose URL matches this regex yield records
    pub page_pattern: Option<String>,

    /// CSS selector of the repeating element; absent means one record per page
    pub item_selector: Option<String>,

    /// Field name to CSS selector, optionally suffixed with `@attr`
    pub fields: BTreeMap<String, String>,
}

/// Output configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct OutputConfig {
    /// Path to the JSON records file
    pub records_path: Option<String>,
}

fn default_workers() -> usize {
    4
}
