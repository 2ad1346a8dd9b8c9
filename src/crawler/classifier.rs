//! URL-shape priority classification
//!
//! The classifier is a pure function of the URL string. Sites differ in which
//! URL shapes lead to the content worth extracting (paginated listings,
//! detail pages), so the classifier is a seam rather than a fixed rule.

use crate::ConfigError;
use regex::{Regex, RegexSet};
use serde::Serialize;
use std::fmt;

/// Priority class for a frontier entry
///
/// `High` orders above `Low`, so `max` picks the more urgent tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Low,
    High,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tier::High => write!(f, "high"),
            Tier::Low => write!(f, "low"),
        }
    }
}

/// Assigns a priority tier to a URL
pub trait TierClassifier: Send + Sync {
    fn classify(&self, url: &str) -> Tier;
}

impl<F> TierClassifier for F
where
    F: Fn(&str) -> Tier + Send + Sync,
{
    fn classify(&self, url: &str) -> Tier {
        self(url)
    }
}

/// Classifies a URL as `High` when it matches any of a set of regexes
#[derive(Debug, Clone)]
pub struct PatternClassifier {
    patterns: RegexSet,
}

impl PatternClassifier {
    /// Compiles the given patterns
    ///
    /// # Examples
    ///
    /// ```
    /// use tidemark::crawler::{PatternClassifier, Tier, TierClassifier};
    ///
    /// let classifier = PatternClassifier::new(&[r"/page/\d+/"]).unwrap();
    /// assert_eq!(classifier.classify("https://site.test/list/page/2/"), Tier::High);
    /// assert_eq!(classifier.classify("https://site.test/item/1"), Tier::Low);
    /// ```
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self, ConfigError> {
        // Compiled one by one first so the error names the offending pattern
        for p in patterns {
            Regex::new(p.as_ref()).map_err(|e| {
                ConfigError::InvalidPattern(format!("'{}': {}", p.as_ref(), e))
            })?;
        }

        let patterns = RegexSet::new(patterns.iter().map(|p| p.as_ref()))
            .map_err(|e| ConfigError::InvalidPattern(e.to_string()))?;

        Ok(Self { patterns })
    }

    /// Number of compiled patterns
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// A classifier that puts every URL in the low tier
    pub fn none() -> Self {
        Self {
            patterns: RegexSet::empty(),
        }
    }
}

impl TierClassifier for PatternClassifier {
    fn classify(&self, url: &str) -> Tier {
        if self.patterns.is_match(url) {
            Tier::High
        } else {
            Tier::Low
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_shape_is_high() {
        let classifier = PatternClassifier::new(&[r"/page/\d+/"]).unwrap();
        assert_eq!(
            classifier.classify("https://site.test/list/page/2/"),
            Tier::High
        );
        assert_eq!(
            classifier.classify("https://site.test/list/page/12/?orderby=price"),
            Tier::High
        );
    }

    #[test]
    fn test_other_shapes_are_low() {
        let classifier = PatternClassifier::new(&[r"/page/\d+/"]).unwrap();
        assert_eq!(classifier.classify("https://site.test/item/1"), Tier::Low);
        assert_eq!(classifier.classify("https://site.test/list/page/"), Tier::Low);
        // No trailing slash: the shape does not match
        assert_eq!(classifier.classify("https://site.test/list/page/2"), Tier::Low);
    }

    #[test]
    fn test_multiple_patterns() {
        let classifier = PatternClassifier::new(&[r"/page/\d+/", r"/programme/[a-z-]+$"]).unwrap();
        assert_eq!(classifier.len(), 2);
        assert_eq!(
            classifier.classify("https://uni.test/programme/msc-computing"),
            Tier::High
        );
    }

    #[test]
    fn test_invalid_pattern_is_config_error() {
        let result = PatternClassifier::new(&[r"/page/\d+/", "(unclosed"]);
        match result {
            Err(ConfigError::InvalidPattern(msg)) => assert!(msg.contains("(unclosed")),
            other => panic!("expected invalid pattern, got {:?}", other),
        }
    }

    #[test]
    fn test_none_is_always_low() {
        let classifier = PatternClassifier::none();
        assert!(classifier.is_empty());
        assert_eq!(classifier.classify("https://site.test/page/1/"), Tier::Low);
    }

    #[test]
    fn test_closure_classifier() {
        let classifier = |url: &str| {
            if url.ends_with(".html") {
                Tier::High
            } else {
                Tier::Low
            }
        };
        assert_eq!(classifier.classify("https://site.test/a.html"), Tier::High);
        assert_eq!(classifier.classify("https://site.test/a"), Tier::Low);
    }

    #[test]
    fn test_high_orders_above_low() {
        assert_eq!(Tier::Low.max(Tier::High), Tier::High);
        assert!(Tier::High > Tier::Low);
    }
}
