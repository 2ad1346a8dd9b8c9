use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Loads and parses a configuration file from the given path
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use tidemark::config::load_config;
///
/// let config = load_config(Path::new("crawl.toml")).unwrap();
/// println!("Start URLs: {:?}", config.crawler.start_urls);
/// ```
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parses and validates configuration from TOML text
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(content)?;
    validate(&config)?;
    Ok(config)
}

/// Computes a SHA-256 hash of the configuration file content
///
/// The hash is carried into the crawl report so exported records can be tied
/// back to the exact configuration that produced them.
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let result = hasher.finalize();
    Ok(hex::encode(result))
}

/// Loads a configuration and returns both the config and its hash
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let config = load_config(path)?;
    let hash = compute_config_hash(path)?;
    Ok((config, hash))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::Backoff;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_load_valid_config() {
        let config_content = r#"
[crawler]
workers = 8
max-pages = 20
start-urls = ["https://shop.test/category/tea/"]
allowed-domains = ["*.shop.test"]

[fetcher]
timeout-secs = 15
max-retries = 3
backoff = "linear"
backoff-base-ms = 500
user-agent = "Mozilla/5.0 (compatible; tidemark)"

[fetcher.headers]
Accept-Language = "en-HK,en;q=0.9"

[classifier]
high-priority = ['/page/\d+/']

[extract]
page-pattern = '/page/\d+/'
item-selector = "li.product"

[extract.fields]
url = "a.woocommerce-LoopProduct-link@href"
name = "h2"
price = "span.price"

[output]
records-path = "./records.json"
"#;

        let file = create_temp_config(config_content);
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.crawler.workers, 8);
        assert_eq!(config.crawler.max_pages, Some(20));
        assert_eq!(config.crawler.allowed_domains, vec!["*.shop.test"]);
        assert_eq!(config.fetcher.backoff, Backoff::Linear);
        assert_eq!(config.fetcher.backoff_base_ms, 500);
        // Unset keys keep their defaults
        assert_eq!(config.fetcher.connect_timeout_secs, 10);
        assert_eq!(config.fetcher.headers.len(), 1);
        assert_eq!(config.extract.fields.len(), 3);
        assert_eq!(
            config.output.records_path.as_deref(),
            Some("./records.json")
        );
    }

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = parse_config(
            r#"
[crawler]
start-urls = ["https://site.test/list"]
"#,
        )
        .unwrap();

        assert_eq!(config.crawler.workers, 4);
        assert_eq!(config.crawler.max_pages, None);
        assert_eq!(config.fetcher.timeout_secs, 15);
        assert_eq!(config.fetcher.max_retries, 3);
        assert_eq!(config.fetcher.backoff, Backoff::Exponential);
        assert_eq!(config.classifier.high_priority, vec![r"/page/\d+/"]);
        assert!(config.extract.fields.is_empty());
        assert!(config.output.records_path.is_none());

        let policy = config.fetcher.retry_policy();
        assert_eq!(policy.max_attempts(), 4);
    }

    #[test]
    fn test_load_config_with_invalid_path() {
        let result = load_config(Path::new("/nonexistent/crawl.toml"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_load_config_with_invalid_toml() {
        let file = create_temp_config("this is not valid TOML {{{");
        let result = load_config(file.path());
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_unknown_backoff_is_parse_error() {
        let result = parse_config(
            r#"
[crawler]
start-urls = ["https://site.test/"]

[fetcher]
backoff = "fibonacci"
"#,
        );
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_load_config_with_validation_error() {
        let config_content = r#"
[crawler]
workers = 0
start-urls = ["https://site.test/"]
"#;

        let file = create_temp_config(config_content);
        let result = load_config(file.path());
        assert!(matches!(result.unwrap_err(), ConfigError::Validation(_)));
    }

    #[test]
    fn test_compute_config_hash() {
        let file = create_temp_config("test content");

        let hash1 = compute_config_hash(file.path()).unwrap();
        let hash2 = compute_config_hash(file.path()).unwrap();

        assert_eq!(hash1, hash2);
        assert_eq!(hash1.len(), 64);
    }

    #[test]
    fn test_different_content_different_hash() {
        let file1 = create_temp_config("content 1");
        let file2 = create_temp_config("content 2");

        let hash1 = compute_config_hash(file1.path()).unwrap();
        let hash2 = compute_config_hash(file2.path()).unwrap();

        assert_ne!(hash1, hash2);
    }
}
