//! Crawl scope: which discovered URLs stay inside the bounded region
//!
//! A scope combines host patterns and URL prefixes. A URL is in scope when it
//! matches at least one host pattern (if any are set) and starts with at least
//! one prefix (if any are set).

use crate::ConfigError;
use url::Url;

/// A host pattern, either exact or with a leading `*.` wildcard
///
/// `*.example.com` matches `example.com` itself and any subdomain of it at
/// any depth. Patterns and hosts are compared case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostPattern {
    base: String,
    wildcard: bool,
}

impl HostPattern {
    /// Parses a host pattern
    ///
    /// # Examples
    ///
    /// ```
    /// use tidemark::url::HostPattern;
    ///
    /// let pattern = HostPattern::parse("*.site.test").unwrap();
    /// assert!(pattern.matches("site.test"));
    /// assert!(pattern.matches("shop.site.test"));
    /// assert!(!pattern.matches("othersite.test"));
    /// ```
    pub fn parse(pattern: &str) -> Result<Self, ConfigError> {
        let pattern = pattern.trim().to_ascii_lowercase();
        let (base, wildcard) = match pattern.strip_prefix("*.") {
            Some(base) => (base.to_string(), true),
            None => (pattern, false),
        };

        if base.is_empty() {
            return Err(ConfigError::InvalidPattern(
                "Host pattern cannot be empty".to_string(),
            ));
        }

        if !base
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
        {
            return Err(ConfigError::InvalidPattern(format!(
                "Host pattern '{}' contains invalid characters",
                base
            )));
        }

        if base.starts_with('.') || base.ends_with('.') || base.contains("..") {
            return Err(ConfigError::InvalidPattern(format!(
                "Host pattern '{}' has an empty label",
                base
            )));
        }

        Ok(Self { base, wildcard })
    }

    /// Exact pattern for a single host
    pub fn exact(host: &str) -> Self {
        Self {
            base: host.to_ascii_lowercase(),
            wildcard: false,
        }
    }

    pub fn matches(&self, host: &str) -> bool {
        let host = host.to_ascii_lowercase();
        if self.wildcard {
            host == self.base
                || (host.len() > self.base.len()
                    && host.ends_with(&self.base)
                    && host.as_bytes()[host.len() - self.base.len() - 1] == b'.')
        } else {
            host == self.base
        }
    }
}

/// The bounded region of the web a crawl may traverse
#[derive(Debug, Clone, Default)]
pub struct Scope {
    hosts: Vec<HostPattern>,
    prefixes: Vec<String>,
}

impl Scope {
    /// Builds a scope from configured host patterns and URL prefixes
    ///
    /// When both lists are empty, the scope is restricted to the hosts of the
    /// start URLs.
    pub fn new(
        allowed_domains: &[String],
        allowed_prefixes: &[String],
        seeds: &[Url],
    ) -> Result<Self, ConfigError> {
        let mut hosts = allowed_domains
            .iter()
            .map(|d| HostPattern::parse(d))
            .collect::<Result<Vec<_>, _>>()?;

        if hosts.is_empty() && allowed_prefixes.is_empty() {
            hosts = seeds
                .iter()
                .filter_map(Url::host_str)
                .map(HostPattern::exact)
                .collect();
        }

        Ok(Self {
            hosts,
            prefixes: allowed_prefixes.to_vec(),
        })
    }

    /// A scope that admits every HTTP(S) URL
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn contains(&self, url: &Url) -> bool {
        let host_ok = self.hosts.is_empty()
            || url
                .host_str()
                .map_or(false, |host| self.hosts.iter().any(|p| p.matches(host)));

        let prefix_ok =
            self.prefixes.is_empty() || self.prefixes.iter().any(|p| url.as_str().starts_with(p));

        host_ok && prefix_ok
    }
}
