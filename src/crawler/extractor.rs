//! Document extraction
//!
//! An [`Extractor`] turns a fetched document into structured records and
//! outbound links. The crawl core never looks inside the document itself; it
//! only routes the links back into the frontier and the records into the
//! result sink.
//!
//! Two extractors ship with the crate:
//! - [`LinkExtractor`] follows anchors and canonical links and emits no records
//! - [`SelectorExtractor`] additionally builds records from configured CSS
//!   selectors on pages whose URL matches a pattern

use crate::config::ExtractConfig;
use crate::crawler::classifier::Tier;
use crate::crawler::fetcher::Document;
use crate::ConfigError;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;
use url::Url;

/// Errors raised while extracting from a single document
#[derive(Debug, Clone, Error)]
pub enum ExtractError {
    #[error("cannot extract records from content type '{content_type}'")]
    UnsupportedContent { content_type: String },

    #[error("extraction failed: {0}")]
    Failed(String),
}

/// Key that holds a record's source URL; no field may use it
pub const SOURCE_URL_FIELD: &str = "source_url";

/// One extracted record
///
/// Fields are an open mapping; a missing field is an empty string rather than
/// an error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Record {
    /// URL of the page the record came from
    pub source_url: String,

    #[serde(flatten)]
    pub fields: BTreeMap<String, String>,
}

impl Record {
    pub fn new(source_url: impl Into<String>) -> Self {
        Self {
            source_url: source_url.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Adds a field; a field named `source_url` is ignored
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        if name != SOURCE_URL_FIELD {
            self.fields.insert(name, value.into());
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

/// A link found in a document, before resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredLink {
    /// The raw `href` value; may be relative
    pub href: String,

    /// Optional priority the extractor suggests; can only promote a link
    pub tier_hint: Option<Tier>,
}

impl DiscoveredLink {
    pub fn new(href: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            tier_hint: None,
        }
    }

    pub fn with_hint(href: impl Into<String>, tier: Tier) -> Self {
        Self {
            href: href.into(),
            tier_hint: Some(tier),
        }
    }
}

/// Everything an extractor produced for one document
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub records: Vec<Record>,
    pub links: Vec<DiscoveredLink>,
}

/// Turns a document into records and links
///
/// `source` is the URL the document was served from. Implementations are
/// called concurrently from every worker and must not share mutable state.
pub trait Extractor: Send + Sync {
    fn extract(&self, document: &Document, source: &Url) -> Result<Extraction, ExtractError>;
}

fn parse_selector(css: &str) -> Result<Selector, ConfigError> {
    Selector::parse(css).map_err(|e| ConfigError::InvalidPattern(format!("'{}': {:?}", css, e)))
}

/// Follows anchors and canonical links
///
/// # Link Extraction Rules
///
/// **Include:**
/// - `<a href="...">` anywhere in the document
/// - `<link rel="canonical" href="...">`
/// - `rel="next"` anchors and links, hinted as high priority
///
/// **Exclude:**
/// - `<a href="..." download>`
/// - Stylesheets, scripts and images
///
/// Non-HTML documents yield no links.
#[derive(Debug, Clone)]
pub struct LinkExtractor {
    anchors: Selector,
    canonical: Selector,
    next: Selector,
}

impl LinkExtractor {
    pub fn new() -> Result<Self, ConfigError> {
        Ok(Self {
            anchors: parse_selector("a[href]")?,
            canonical: parse_selector("link[rel='canonical'][href]")?,
            next: parse_selector("link[rel~='next'][href]")?,
        })
    }

    fn links(&self, html: &Html) -> Vec<DiscoveredLink> {
        let mut links = Vec::new();

        for element in html.select(&self.anchors) {
            if element.value().attr("download").is_some() {
                continue;
            }
            if let Some(href) = element.value().attr("href") {
                links.push(link_for(href, element));
            }
        }

        for element in html.select(&self.canonical) {
            if let Some(href) = element.value().attr("href") {
                links.push(DiscoveredLink::new(href));
            }
        }

        for element in html.select(&self.next) {
            if let Some(href) = element.value().attr("href") {
                links.push(DiscoveredLink::with_hint(href, Tier::High));
            }
        }

        links
    }
}

/// Builds a link from an anchor, promoting `rel="next"` pagination anchors
fn link_for(href: &str, element: ElementRef<'_>) -> DiscoveredLink {
    let is_next = element
        .value()
        .attr("rel")
        .map(|rel| rel.split_ascii_whitespace().any(|r| r.eq_ignore_ascii_case("next")))
        .unwrap_or(false);

    if is_next {
        DiscoveredLink::with_hint(href, Tier::High)
    } else {
        DiscoveredLink::new(href)
    }
}

impl Extractor for LinkExtractor {
    fn extract(&self, document: &Document, _source: &Url) -> Result<Extraction, ExtractError> {
        if !document.is_html() {
            return Ok(Extraction::default());
        }

        let html = Html::parse_document(&document.body);
        Ok(Extraction {
            records: Vec::new(),
            links: self.links(&html),
        })
    }
}

/// A configured record field: a CSS selector plus an optional attribute
#[derive(Debug, Clone)]
struct FieldSpec {
    name: String,
    selector: Selector,
    attr: Option<String>,
}

impl FieldSpec {
    /// Parses `"css"` or `"css@attr"`
    fn parse(name: &str, spec: &str) -> Result<Self, ConfigError> {
        let (css, attr) = match spec.rsplit_once('@') {
            Some((css, attr)) if is_attr_name(attr) => (css, Some(attr.to_string())),
            _ => (spec, None),
        };

        if name == SOURCE_URL_FIELD {
            return Err(ConfigError::Validation(format!(
                "field name '{}' is reserved",
                SOURCE_URL_FIELD
            )));
        }

        if css.trim().is_empty() {
            return Err(ConfigError::InvalidPattern(format!(
                "field '{}' has an empty selector",
                name
            )));
        }

        Ok(Self {
            name: name.to_string(),
            selector: parse_selector(css.trim())?,
            attr,
        })
    }

    /// Value of this field within `scope`, or an empty string
    fn value(&self, scope: ElementRef<'_>, source: &Url) -> String {
        let Some(element) = scope.select(&self.selector).next() else {
            return String::new();
        };

        match &self.attr {
            Some(attr) => match element.value().attr(attr) {
                Some(value) if is_url_attr(attr) => source
                    .join(value.trim())
                    .map(|u| u.to_string())
                    .unwrap_or_else(|_| value.trim().to_string()),
                Some(value) => value.trim().to_string(),
                None => String::new(),
            },
            None => collapse_whitespace(element.text()),
        }
    }
}

fn is_attr_name(s: &str) -> bool {
    !s.is_empty()
        && s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == ':')
}

fn is_url_attr(attr: &str) -> bool {
    matches!(attr, "href" | "src" | "data-src")
}

fn collapse_whitespace<'a>(text: impl Iterator<Item = &'a str>) -> String {
    let joined: String = text.collect::<Vec<_>>().join(" ");
    joined.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Builds records from CSS selectors and follows links like [`LinkExtractor`]
///
/// Records are only produced on pages whose URL matches `page_pattern` (all
/// pages when unset). With an item selector each matching element becomes one
/// record; without one the whole page is a single record.
#[derive(Debug, Clone)]
pub struct SelectorExtractor {
    links: LinkExtractor,
    page_pattern: Option<Regex>,
    item: Option<Selector>,
    fields: Vec<FieldSpec>,
}

impl SelectorExtractor {
    /// Compiles an extractor from the `[extract]` configuration section
    pub fn from_config(config: &ExtractConfig) -> Result<Self, ConfigError> {
        let page_pattern = config
            .page_pattern
            .as_deref()
            .map(|p| {
                Regex::new(p).map_err(|e| ConfigError::InvalidPattern(format!("'{}': {}", p, e)))
            })
            .transpose()?;

        let item = config.item_selector.as_deref().map(parse_selector).transpose()?;

        let fields = config
            .fields
            .iter()
            .map(|(name, spec)| FieldSpec::parse(name, spec))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            links: LinkExtractor::new()?,
            page_pattern,
            item,
            fields,
        })
    }

    /// Returns true if records should be extracted from this URL
    pub fn wants_records(&self, url: &str) -> bool {
        !self.fields.is_empty()
            && self
                .page_pattern
                .as_ref()
                .map(|p| p.is_match(url))
                .unwrap_or(true)
    }

    fn record(&self, scope: ElementRef<'_>, source: &Url) -> Record {
        let mut record = Record::new(source.as_str());
        for field in &self.fields {
            record
                .fields
                .insert(field.name.clone(), field.value(scope, source));
        }
        record
    }

    fn records(&self, html: &Html, source: &Url) -> Vec<Record> {
        match &self.item {
            Some(item) => html
                .select(item)
                .map(|element| self.record(element, source))
                .collect(),
            None => vec![self.record(html.root_element(), source)],
        }
    }
}

impl Extractor for SelectorExtractor {
    fn extract(&self, document: &Document, source: &Url) -> Result<Extraction, ExtractError> {
        let wants_records = self.wants_records(source.as_str());

        if !document.is_html() {
            if wants_records {
                return Err(ExtractError::UnsupportedContent {
                    content_type: document.content_type.clone().unwrap_or_default(),
                });
            }
            return Ok(Extraction::default());
        }

        let html = Html::parse_document(&document.body);
        let records = if wants_records {
            self.records(&html, source)
        } else {
            Vec::new()
        };

        Ok(Extraction {
            records,
            links: self.links.links(&html),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = r#"
        <html>
        <head>
            <title>Shop</title>
            <link rel="canonical" href="https://site.test/list/page/2/">
            <link rel="stylesheet" href="/style.css">
        </head>
        <body>
            <ul>
                <li class="product">
                    <a href="/item/1"><img src="/img/1.jpg"></a>
                    <h2>  Green
                        Tea </h2>
                    <span class="price">$12</span>
                </li>
                <li class="product">
                    <a href="/item/2"><img src="/img/2.jpg"></a>
                    <h2>Oolong</h2>
                </li>
            </ul>
            <a href="/list/page/3/" rel="next">Next</a>
            <a href="/brochure.pdf" download>Brochure</a>
            <a href="mailto:shop@site.test">Mail</a>
        </body>
        </html>
    "#;

    fn document(url: &str, body: &str) -> Document {
        Document {
            url: Url::parse(url).unwrap(),
            status: 200,
            content_type: Some("text/html; charset=utf-8".to_string()),
            encoding: "UTF-8",
            body: body.to_string(),
        }
    }

    fn product_config() -> ExtractConfig {
        let mut fields = BTreeMap::new();
        fields.insert("url".to_string(), "a@href".to_string());
        fields.insert("image".to_string(), "img@src".to_string());
        fields.insert("name".to_string(), "h2".to_string());
        fields.insert("price".to_string(), "span.price".to_string());
        ExtractConfig {
            page_pattern: Some(r"/page/\d+/".to_string()),
            item_selector: Some("li.product".to_string()),
            fields,
        }
    }

    #[test]
    fn test_link_extractor_collects_anchors_and_canonical() {
        let extractor = LinkExtractor::new().unwrap();
        let source = Url::parse("https://site.test/list/page/2/").unwrap();
        let extraction = extractor
            .extract(&document(source.as_str(), LISTING), &source)
            .unwrap();

        let hrefs: Vec<&str> = extraction.links.iter().map(|l| l.href.as_str()).collect();
        assert!(hrefs.contains(&"/item/1"));
        assert!(hrefs.contains(&"/item/2"));
        assert!(hrefs.contains(&"https://site.test/list/page/2/"));
        assert!(!hrefs.contains(&"/brochure.pdf"));
        assert!(!hrefs.contains(&"/style.css"));
        assert!(extraction.records.is_empty());
    }

    #[test]
    fn test_rel_next_is_hinted_high() {
        let extractor = LinkExtractor::new().unwrap();
        let source = Url::parse("https://site.test/list/page/2/").unwrap();
        let extraction = extractor
            .extract(&document(source.as_str(), LISTING), &source)
            .unwrap();

        let next = extraction
            .links
            .iter()
            .find(|l| l.href == "/list/page/3/")
            .unwrap();
        assert_eq!(next.tier_hint, Some(Tier::High));

        let item = extraction.links.iter().find(|l| l.href == "/item/1").unwrap();
        assert_eq!(item.tier_hint, None);
    }

    #[test]
    fn test_non_html_yields_nothing() {
        let extractor = LinkExtractor::new().unwrap();
        let source = Url::parse("https://site.test/data.json").unwrap();
        let mut doc = document(source.as_str(), r#"{"a": "<a href='/x'>"}"#);
        doc.content_type = Some("application/json".to_string());

        let extraction = extractor.extract(&doc, &source).unwrap();
        assert!(extraction.links.is_empty());
    }

    #[test]
    fn test_selector_extractor_builds_records() {
        let extractor = SelectorExtractor::from_config(&product_config()).unwrap();
        let source = Url::parse("https://site.test/list/page/2/").unwrap();
        let extraction = extractor
            .extract(&document(source.as_str(), LISTING), &source)
            .unwrap();

        assert_eq!(extraction.records.len(), 2);

        let first = &extraction.records[0];
        assert_eq!(first.source_url, "https://site.test/list/page/2/");
        assert_eq!(first.get("name"), Some("Green Tea"));
        assert_eq!(first.get("price"), Some("$12"));
        assert_eq!(first.get("url"), Some("https://site.test/item/1"));
        assert_eq!(first.get("image"), Some("https://site.test/img/1.jpg"));

        // Missing field is empty, not an error
        assert_eq!(extraction.records[1].get("price"), Some(""));
        assert!(!extraction.links.is_empty());
    }

    #[test]
    fn test_selector_extractor_skips_non_matching_pages() {
        let extractor = SelectorExtractor::from_config(&product_config()).unwrap();
        let source = Url::parse("https://site.test/item/1").unwrap();
        let extraction = extractor
            .extract(&document(source.as_str(), LISTING), &source)
            .unwrap();

        assert!(extraction.records.is_empty());
        assert!(!extraction.links.is_empty());
    }

    #[test]
    fn test_page_level_record_without_item_selector() {
        let mut fields = BTreeMap::new();
        fields.insert("title".to_string(), "title".to_string());
        fields.insert("summary".to_string(), "p.summary".to_string());
        let config = ExtractConfig {
            page_pattern: None,
            item_selector: None,
            fields,
        };

        let extractor = SelectorExtractor::from_config(&config).unwrap();
        let source = Url::parse("https://uni.test/programme/msc").unwrap();
        let extraction = extractor
            .extract(&document(source.as_str(), LISTING), &source)
            .unwrap();

        assert_eq!(extraction.records.len(), 1);
        assert_eq!(extraction.records[0].get("title"), Some("Shop"));
        assert_eq!(extraction.records[0].get("summary"), Some(""));
    }

    #[test]
    fn test_non_html_record_page_is_error() {
        let extractor = SelectorExtractor::from_config(&product_config()).unwrap();
        let source = Url::parse("https://site.test/list/page/2/").unwrap();
        let mut doc = document(source.as_str(), "%PDF-1.4");
        doc.content_type = Some("application/pdf".to_string());

        let result = extractor.extract(&doc, &source);
        assert!(matches!(
            result,
            Err(ExtractError::UnsupportedContent { .. })
        ));
    }

    #[test]
    fn test_invalid_selector_is_config_error() {
        let mut config = product_config();
        config.item_selector = Some("li[".to_string());
        assert!(matches!(
            SelectorExtractor::from_config(&config),
            Err(ConfigError::InvalidPattern(_))
        ));
    }

    #[test]
    fn test_field_spec_attribute_suffix() {
        let spec = FieldSpec::parse("link", "a.more@href").unwrap();
        assert_eq!(spec.attr.as_deref(), Some("href"));

        let spec = FieldSpec::parse("name", "h2").unwrap();
        assert!(spec.attr.is_none());

        assert!(FieldSpec::parse("empty", "@href").is_err());
        assert!(matches!(
            FieldSpec::parse("source_url", "a@href"),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_record_serializes_flat() {
        let record = Record::new("https://site.test/p").with_field("name", "Tea");
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["source_url"], "https://site.test/p");
        assert_eq!(json["name"], "Tea");
    }

    #[test]
    fn test_field_cannot_shadow_source_url() {
        let record = Record::new("https://site.test/p")
            .with_field("source_url", "/relative")
            .with_field("name", "Tea");
        assert_eq!(record.get("source_url"), None);

        let text = serde_json::to_string(&record).unwrap();
        assert_eq!(text.matches("\"source_url\"").count(), 1);
        let json: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(json["source_url"], "https://site.test/p");
    }
}
