//! URL handling module for Tidemark
//!
//! This module provides URL normalization, link resolution and the crawl
//! scope that keeps traversal inside a bounded region of a site.

mod normalize;
mod scope;

pub use normalize::{dedup_key, normalize_parsed, normalize_url};
pub use scope::{HostPattern, Scope};

use url::Url;

/// Resolves a link href to an absolute URL and validates it
///
/// Returns None if the link should be excluded:
/// - javascript:, mailto:, tel: schemes
/// - data: URIs
/// - Fragment-only links (same page anchors)
/// - Invalid URLs
/// - Non-HTTP(S) URLs after resolution
///
/// The fragment of the resolved URL is stripped; everything else is kept as
/// the page linked it, since that is the form that gets fetched.
///
/// # Examples
///
/// ```
/// use tidemark::url::resolve_link;
/// use url::Url;
///
/// let base = Url::parse("https://site.test/list").unwrap();
/// let link = resolve_link("list/page/2/#top", &base).unwrap();
/// assert_eq!(link.as_str(), "https://site.test/list/page/2/");
/// assert!(resolve_link("mailto:admin@site.test", &base).is_none());
/// ```
pub fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lowered = href.to_ascii_lowercase();
    if lowered.starts_with("javascript:")
        || lowered.starts_with("mailto:")
        || lowered.starts_with("tel:")
        || lowered.starts_with("data:")
    {
        return None;
    }

    let mut absolute = base_url.join(href).ok()?;
    if absolute.scheme() != "http" && absolute.scheme() != "https" {
        return None;
    }
    if absolute.host_str().is_none() {
        return None;
    }

    absolute.set_fragment(None);
    Some(absolute)
}
