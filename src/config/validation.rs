use crate::config::types::{Config, CrawlerConfig, PolicyConfig, StoreConfig, StoreKind};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_policy_config(&config.policy)?;
    validate_store_config(&config.store)?;
    validate_urls("seed", &config.seeds)?;
    validate_urls("proxy", &config.proxies)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.max_connections < 1 {
        return Err(ConfigError::Validation(format!(
            "max-connections must be >= 1, got {}",
            config.max_connections
        )));
    }

    if config.timeout < 1 {
        return Err(ConfigError::Validation(
            "timeout must be >= 1ms".to_string(),
        ));
    }

    if config.depth_limit < -1 {
        return Err(ConfigError::Validation(format!(
            "depth-limit must be -1 or a non-negative depth, got {}",
            config.depth_limit
        )));
    }

    if config.max_errors < -1 || config.max_errors == 0 {
        return Err(ConfigError::Validation(format!(
            "max-errors must be -1 or >= 1, got {}",
            config.max_errors
        )));
    }

    if config.error_rates.windows(2).any(|w| w[0] > w[1]) {
        return Err(ConfigError::Validation(format!(
            "error-rates must be ascending, got {:?}",
            config.error_rates
        )));
    }

    validate_method(&config.method)?;

    if config.user_agent.is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates link policy configuration
fn validate_policy_config(config: &PolicyConfig) -> Result<(), ConfigError> {
    if config.protocols.is_empty() {
        return Err(ConfigError::Validation(
            "protocols must allow at least one scheme".to_string(),
        ));
    }

    for domain in &config.domain_blacklist {
        validate_domain_string(domain)?;
    }

    Ok(())
}

fn validate_store_config(config: &StoreConfig) -> Result<(), ConfigError> {
    if config.kind == StoreKind::Sqlite && config.path.is_empty() {
        return Err(ConfigError::Validation(
            "store.path cannot be empty for the sqlite store".to_string(),
        ));
    }
    Ok(())
}

fn validate_urls(what: &str, urls: &[String]) -> Result<(), ConfigError> {
    for raw in urls {
        let url = Url::parse(raw)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} URL '{}': {}", what, raw, e)))?;

        if !url.has_host() {
            return Err(ConfigError::InvalidUrl(format!(
                "{} URL '{}' has no host",
                what, raw
            )));
        }
    }
    Ok(())
}

/// An HTTP method must be a non-empty token
fn validate_method(method: &str) -> Result<(), ConfigError> {
    if method.is_empty() || !method.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(ConfigError::Validation(format!(
            "method must be an HTTP method name, got '{}'",
            method
        )));
    }
    Ok(())
}

/// Validates a blacklisted domain string
fn validate_domain_string(domain: &str) -> Result<(), ConfigError> {
    if domain.is_empty() {
        return Err(ConfigError::Validation(
            "Domain cannot be empty".to_string(),
        ));
    }

    if !domain
        .chars()
        .all(|c| c.is_alphanumeric() || c == '.' || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "Domain '{}' contains invalid characters",
            domain
        )));
    }

    if domain.starts_with('.')
        || domain.ends_with('.')
        || domain.starts_with('-')
        || domain.ends_with('-')
        || domain.contains("..")
    {
        return Err(ConfigError::Validation(format!(
            "Domain '{}' is malformed",
            domain
        )));
    }

    Ok(())
}
