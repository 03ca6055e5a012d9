use crate::config::types::{CacheBackend, CacheConfig, Config, CrawlerConfig, OutputConfig, SiteConfig};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_site_config(&config.site)?;
    validate_cache_config(&config.cache)?;
    validate_output_config(&config.output)?;
    Ok(())
}

fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.max_concurrent_tasks < 1 || config.max_concurrent_tasks > 100 {
        return Err(ConfigError::Validation(format!(
            "max-concurrent-tasks must be between 1 and 100, got {}",
            config.max_concurrent_tasks
        )));
    }

    if config.max_pages < 1 {
        return Err(ConfigError::Validation(
            "max-pages must be >= 1".to_string(),
        ));
    }

    if config.ready_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "ready-timeout-secs must be > 0".to_string(),
        ));
    }

    if config.poll_interval_ms == 0 {
        return Err(ConfigError::Validation(
            "poll-interval-ms must be > 0".to_string(),
        ));
    }

    if config.not_found_marker.trim().is_empty() {
        return Err(ConfigError::Validation(
            "not-found-marker cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_site_config(config: &SiteConfig) -> Result<(), ConfigError> {
    let base = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base-url: {}", e)))?;

    if base.scheme() != "http" && base.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "base-url must use http or https, got '{}'",
            config.base_url
        )));
    }

    if base.cannot_be_a_base() {
        return Err(ConfigError::InvalidUrl(format!(
            "base-url cannot be used as a base: '{}'",
            config.base_url
        )));
    }

    Ok(())
}

fn validate_cache_config(config: &CacheConfig) -> Result<(), ConfigError> {
    match config.backend {
        CacheBackend::Redis => {
            let url = Url::parse(&config.redis_url)
                .map_err(|e| ConfigError::InvalidUrl(format!("Invalid redis-url: {}", e)))?;
            if !matches!(url.scheme(), "redis" | "rediss" | "redis+unix" | "unix") {
                return Err(ConfigError::InvalidUrl(format!(
                    "redis-url must use a redis scheme, got '{}'",
                    config.redis_url
                )));
            }
        }
        CacheBackend::Sqlite => {
            if config.sqlite_path.as_os_str().is_empty() {
                return Err(ConfigError::Validation(
                    "sqlite-path cannot be empty".to_string(),
                ));
            }
        }
        CacheBackend::Disabled => {}
    }

    Ok(())
}

fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.result_path.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "result-path cannot be empty".to_string(),
        ));
    }

    if config.export_path.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "export-path cannot be empty".to_string(),
        ));
    }

    Ok(())
}
