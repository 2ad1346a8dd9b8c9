//! HTTP fetcher implementation
//!
//! This module handles all network access for the crawler, including:
//! - Building HTTP clients with the configured identity and headers
//! - Classifying responses and transport errors as terminal or retryable
//! - Retrying transient failures through a [`RetryPolicy`]
//! - Decoding bodies with a declared or sniffed charset

use crate::config::FetcherConfig;
use crate::crawler::encoding::decode_body;
use crate::crawler::retry::RetryPolicy;
use crate::ConfigError;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Errors produced by a single fetch attempt or by the retry loop
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    #[error("resource not found (HTTP {status})")]
    NotFound { status: u16 },

    #[error("server returned HTTP {status}")]
    Status { status: u16 },

    #[error("request rejected with HTTP {status}")]
    Rejected { status: u16 },

    #[error("network error: {message}")]
    Network { message: String, timeout: bool },

    #[error("malformed response: {message}")]
    Body { message: String },

    #[error("redirect error: {message}")]
    Redirect { message: String },

    #[error("gave up after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: Box<FetchError> },

    #[error("fetch cancelled")]
    Cancelled,
}

impl FetchError {
    /// Returns true if another attempt might succeed
    ///
    /// # Retry Logic
    ///
    /// | Condition | Action |
    /// |-----------|--------|
    /// | HTTP 404, 410 | Terminal, skipped as not found |
    /// | HTTP 5xx, 408, 429 | Retry |
    /// | Other HTTP 4xx | Terminal, counted as failed |
    /// | Timeout, connection error | Retry |
    /// | Truncated or unreadable body | Retry |
    /// | Redirect loop or chain too long | Terminal, counted as failed |
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Status { .. } | Self::Network { .. } | Self::Body { .. }
        )
    }

    /// Maps a response status to an error, or None for success
    pub fn from_status(status: StatusCode) -> Option<Self> {
        let code = status.as_u16();
        if status.is_success() {
            None
        } else if status == StatusCode::NOT_FOUND || status == StatusCode::GONE {
            Some(Self::NotFound { status: code })
        } else if status.is_server_error()
            || status == StatusCode::REQUEST_TIMEOUT
            || status == StatusCode::TOO_MANY_REQUESTS
        {
            Some(Self::Status { status: code })
        } else {
            Some(Self::Rejected { status: code })
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_redirect() {
            Self::Redirect {
                message: e.to_string(),
            }
        } else if e.is_body() || e.is_decode() {
            Self::Body {
                message: e.to_string(),
            }
        } else {
            Self::Network {
                message: e.to_string(),
                timeout: e.is_timeout(),
            }
        }
    }
}

/// Why a URL was skipped rather than fetched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The resource does not exist
    NotFound,

    /// The crawl was stopped before the fetch could complete
    Cancelled,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::Cancelled => "cancelled",
        }
    }
}

/// A successfully fetched and decoded document
#[derive(Debug, Clone)]
pub struct Document {
    /// Final URL after redirects
    pub url: Url,

    /// HTTP status code
    pub status: u16,

    /// Content-Type header value
    pub content_type: Option<String>,

    /// Name of the charset the body was decoded with
    pub encoding: &'static str,

    /// Decoded body text
    pub body: String,
}

impl Document {
    /// Returns true if the content type is HTML, or unknown
    pub fn is_html(&self) -> bool {
        match &self.content_type {
            Some(ct) => {
                let ct = ct.to_ascii_lowercase();
                ct.contains("text/html") || ct.contains("application/xhtml")
            }
            None => true,
        }
    }
}

/// Result of fetching one URL
///
/// Never a bare document: an absent page and an empty page are different.
#[derive(Debug)]
pub enum FetchOutcome {
    Success(Document),
    Skipped(SkipReason),
    Failed(FetchError),
}

impl FetchOutcome {
    /// Folds the result of a retry loop into an outcome
    pub fn from_result(result: Result<Document, FetchError>) -> Self {
        match result {
            Ok(document) => Self::Success(document),
            Err(FetchError::NotFound { .. }) => Self::Skipped(SkipReason::NotFound),
            Err(FetchError::Cancelled) => Self::Skipped(SkipReason::Cancelled),
            Err(e) => Self::Failed(e),
        }
    }
}

/// Retrieves documents for the crawl
///
/// Implementations must not touch crawl state; they only perform requests.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &Url, cancel: &CancellationToken) -> FetchOutcome;
}

/// Builds the header map for configured extra request headers
pub fn header_map(headers: &BTreeMap<String, String>) -> Result<HeaderMap, ConfigError> {
    let mut map = HeaderMap::new();
    for (name, value) in headers {
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| ConfigError::InvalidHeader(format!("'{}': {}", name, e)))?;
        let header_value = HeaderValue::from_str(value)
            .map_err(|e| ConfigError::InvalidHeader(format!("'{}': {}", name, e)))?;
        map.insert(header_name, header_value);
    }
    Ok(map)
}

/// Builds an HTTP client with proper configuration
///
/// # Example
///
/// ```no_run
/// use tidemark::config::FetcherConfig;
/// use tidemark::crawler::build_http_client;
///
/// let client = build_http_client(&FetcherConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &FetcherConfig) -> Result<Client, crate::CrawlError> {
    let headers = header_map(&config.headers)?;

    let client = Client::builder()
        .user_agent(config.user_agent.clone())
        .default_headers(headers)
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .gzip(true)
        .brotli(true)
        .build()?;

    Ok(client)
}

/// Fetcher backed by `reqwest` with bounded retries
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    policy: RetryPolicy,
}

impl HttpFetcher {
    /// Creates a fetcher from configuration
    pub fn new(config: &FetcherConfig) -> Result<Self, crate::CrawlError> {
        Ok(Self {
            client: build_http_client(config)?,
            policy: config.retry_policy(),
        })
    }

    pub fn with_client(client: Client, policy: RetryPolicy) -> Self {
        Self { client, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Performs exactly one request
    async fn fetch_once(&self, url: &Url) -> Result<Document, FetchError> {
        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();

        if let Some(error) = FetchError::from_status(status) {
            return Err(error);
        }

        let final_url = response.url().clone();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let bytes = response.bytes().await.map_err(|e| FetchError::Body {
            message: e.to_string(),
        })?;

        let (body, encoding) = decode_body(&bytes, content_type.as_deref());

        Ok(Document {
            url: final_url,
            status: status.as_u16(),
            content_type,
            encoding: encoding.name(),
            body,
        })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &Url, cancel: &CancellationToken) -> FetchOutcome {
        let result = self
            .policy
            .run(url.as_str(), cancel, |attempt| {
                tracing::trace!("GET {} (attempt {})", url, attempt);
                self.fetch_once(url)
            })
            .await;

        FetchOutcome::from_result(result)
    }
}
