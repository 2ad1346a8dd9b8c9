use crate::UrlError;
use url::Url;

/// Normalizes a URL into its deduplication form
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed
/// 2. Require an HTTP or HTTPS scheme and a host
/// 3. Lowercase the host and drop the scheme's default port (done by the parser)
/// 4. Normalize path:
///    - Remove dot segments (. and ..)
///    - Collapse repeated slashes
///    - Remove trailing slash (except for root /)
///    - Empty path becomes /
/// 5. Remove fragment (everything after #)
/// 6. Remove empty query string (trailing ?)
///
/// The query string is otherwise kept verbatim: on listing pages the query
/// often selects different content, so reordering or dropping parameters
/// could merge distinct pages.
///
/// # Examples
///
/// ```
/// use tidemark::url::normalize_url;
///
/// let url = normalize_url("HTTP://Site.TEST:80/list/page/2/#top").unwrap();
/// assert_eq!(url.as_str(), "http://site.test/list/page/2");
/// ```
pub fn normalize_url(url_str: &str) -> Result<Url, UrlError> {
    let url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;
    normalize_parsed(url)
}

/// Normalizes an already-parsed URL
pub fn normalize_parsed(mut url: Url) -> Result<Url, UrlError> {
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(UrlError::MissingHost);
    }

    let normalized_path = normalize_path(url.path());
    url.set_path(&normalized_path);

    url.set_fragment(None);

    if matches!(url.query(), Some("")) {
        url.set_query(None);
    }

    Ok(url)
}

/// Returns the identity string used by the frontier's seen-set
pub fn dedup_key(url: &Url) -> String {
    match normalize_parsed(url.clone()) {
        Ok(normalized) => normalized.into(),
        // Non-HTTP URLs never reach the frontier, but keep a stable key anyway
        Err(_) => {
            let mut fallback = url.clone();
            fallback.set_fragment(None);
            fallback.into()
        }
    }
}

/// Normalizes a URL path by removing dot segments and trailing slashes
fn normalize_path(path: &str) -> String {
    if path.is_empty() {
        return "/".to_string();
    }

    let mut segments: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => continue,
            ".." => {
                segments.pop();
            }
            _ => segments.push(segment),
        }
    }

    if segments.is_empty() {
        return "/".to_string();
    }

    format!("/{}", segments.join("/"))
}
