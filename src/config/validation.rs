use crate::config::types::{
    ClassifierConfig, Config, CrawlerConfig, ExtractConfig, FetcherConfig, OutputConfig,
};
use crate::crawler::{header_map, PatternClassifier, SelectorExtractor, SOURCE_URL_FIELD};
use crate::url::{normalize_url, HostPattern};
use crate::ConfigError;

/// Largest worker pool a config may ask for
const MAX_WORKERS: usize = 256;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_fetcher_config(&config.fetcher)?;
    validate_classifier_config(&config.classifier)?;
    validate_extract_config(&config.extract)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.workers < 1 || config.workers > MAX_WORKERS {
        return Err(ConfigError::Validation(format!(
            "workers must be between 1 and {}, got {}",
            MAX_WORKERS, config.workers
        )));
    }

    if config.max_pages == Some(0) {
        return Err(ConfigError::Validation(
            "max-pages must be >= 1 when set".to_string(),
        ));
    }

    if config.start_urls.is_empty() {
        return Err(ConfigError::Validation(
            "at least one start URL is required".to_string(),
        ));
    }

    for seed in &config.start_urls {
        validate_start_url(seed)?;
    }

    for domain in &config.allowed_domains {
        HostPattern::parse(domain)?;
    }

    for prefix in &config.allowed_prefixes {
        validate_start_url(prefix).map_err(|_| {
            ConfigError::InvalidUrl(format!("Invalid allowed prefix '{}'", prefix))
        })?;
    }

    Ok(())
}

/// Validates that a start URL is absolute http(s) with a host
fn validate_start_url(seed: &str) -> Result<(), ConfigError> {
    normalize_url(seed)
        .map(|_| ())
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid start URL '{}': {}", seed, e)))
}

/// Validates fetcher configuration
fn validate_fetcher_config(config: &FetcherConfig) -> Result<(), ConfigError> {
    if config.timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "timeout-secs must be >= 1".to_string(),
        ));
    }

    if config.connect_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "connect-timeout-secs must be >= 1".to_string(),
        ));
    }

    if let Some(max) = config.backoff_max_ms {
        if max < config.backoff_base_ms {
            return Err(ConfigError::Validation(format!(
                "backoff-max-ms ({}) must be >= backoff-base-ms ({})",
                max, config.backoff_base_ms
            )));
        }
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    header_map(&config.headers)?;

    Ok(())
}

fn validate_classifier_config(config: &ClassifierConfig) -> Result<(), ConfigError> {
    PatternClassifier::new(&config.high_priority).map(|_| ())
}

/// Compiles every selector and pattern once so mistakes surface before crawling
fn validate_extract_config(config: &ExtractConfig) -> Result<(), ConfigError> {
    if config.item_selector.is_some() && config.fields.is_empty() {
        return Err(ConfigError::Validation(
            "item-selector is set but no [extract.fields] are configured".to_string(),
        ));
    }

    if config.fields.contains_key(SOURCE_URL_FIELD) {
        return Err(ConfigError::Validation(format!(
            "[extract.fields] cannot define '{}'; it is filled with the page URL",
            SOURCE_URL_FIELD
        )));
    }

    SelectorExtractor::from_config(config).map(|_| ())
}

fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if let Some(path) = &config.records_path {
        if path.trim().is_empty() {
            return Err(ConfigError::Validation(
                "records-path cannot be empty".to_string(),
            ));
        }
    }
    Ok(())
}
