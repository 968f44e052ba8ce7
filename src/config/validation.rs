use crate::config::types::{
    Config, CrawlerConfig, OutputConfig, SourceConfig, StoreConfig, ThrottleConfig,
};
use crate::ConfigError;
use std::collections::HashSet;
use url::Url;

/// Longest profile name the source accepts
const MAX_PROFILE_LEN: usize = 30;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_throttle_config(&config.throttle)?;
    validate_source_config(&config.source)?;
    validate_output_config(&config.output)?;
    validate_store_config(&config.store)?;
    for profile in &config.profiles {
        validate_profile_name(profile)?;
    }
    Ok(())
}

/// Validates crawler scheduling limits
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.worker_count < 1 || config.worker_count > 64 {
        return Err(ConfigError::Validation(format!(
            "worker_count must be between 1 and 64, got {}",
            config.worker_count
        )));
    }

    if config.chunks_per_profile < 1 || config.chunks_per_profile > 64 {
        return Err(ConfigError::Validation(format!(
            "chunks_per_profile must be between 1 and 64, got {}",
            config.chunks_per_profile
        )));
    }

    if config.max_attempts < 1 {
        return Err(ConfigError::Validation(
            "max_attempts must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates throttle ranges
fn validate_throttle_config(config: &ThrottleConfig) -> Result<(), ConfigError> {
    if !(0.0..=1.0).contains(&config.emit_delay_probability) {
        return Err(ConfigError::Validation(format!(
            "emit_delay_probability must be within [0, 1], got {}",
            config.emit_delay_probability
        )));
    }

    if config.emit_delay_min_ms > config.emit_delay_max_ms {
        return Err(ConfigError::Validation(format!(
            "emit_delay_min_ms ({}) exceeds emit_delay_max_ms ({})",
            config.emit_delay_min_ms, config.emit_delay_max_ms
        )));
    }

    if config.rate_limit_jitter_min_ms > config.rate_limit_jitter_max_ms {
        return Err(ConfigError::Validation(format!(
            "rate_limit_jitter_min_ms ({}) exceeds rate_limit_jitter_max_ms ({})",
            config.rate_limit_jitter_min_ms, config.rate_limit_jitter_max_ms
        )));
    }

    Ok(())
}

/// Validates the data source and its sessions
fn validate_source_config(config: &SourceConfig) -> Result<(), ConfigError> {
    match (&config.base_url, &config.fixture_path) {
        (Some(_), Some(_)) => {
            return Err(ConfigError::Validation(
                "base_url and fixture_path are mutually exclusive".to_string(),
            ));
        }
        (None, None) => {
            return Err(ConfigError::Validation(
                "one of base_url or fixture_path is required".to_string(),
            ));
        }
        (Some(base_url), None) => {
            let url = Url::parse(base_url)
                .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base_url: {}", e)))?;
            if url.scheme() != "https" && url.scheme() != "http" {
                return Err(ConfigError::InvalidUrl(format!(
                    "base_url '{}' must use http or https",
                    base_url
                )));
            }
        }
        (None, Some(fixture_path)) => {
            if fixture_path.is_empty() {
                return Err(ConfigError::Validation(
                    "fixture_path cannot be empty".to_string(),
                ));
            }
        }
    }

    // A credential pair needs two distinct handles to fail over between
    if config.sessions.len() < 2 {
        return Err(ConfigError::Validation(format!(
            "at least two sessions are required, got {}",
            config.sessions.len()
        )));
    }

    let mut names = HashSet::new();
    for session in &config.sessions {
        if session.name.is_empty() {
            return Err(ConfigError::Validation(
                "session name cannot be empty".to_string(),
            ));
        }
        if !names.insert(session.name.as_str()) {
            return Err(ConfigError::Validation(format!(
                "duplicate session name '{}'",
                session.name
            )));
        }
    }

    Ok(())
}

fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.path.is_empty() {
        return Err(ConfigError::Validation(
            "output path cannot be empty".to_string(),
        ));
    }

    if config.batch_size < 1 {
        return Err(ConfigError::Validation(
            "batch_size must be >= 1".to_string(),
        ));
    }

    Ok(())
}

fn validate_store_config(config: &StoreConfig) -> Result<(), ConfigError> {
    if config.path.is_empty() {
        return Err(ConfigError::Validation(
            "store path cannot be empty".to_string(),
        ));
    }

    if config.scratch_dir.is_empty() {
        return Err(ConfigError::Validation(
            "scratch_dir cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates a profile name: 1 to 30 characters of letters, digits, `.` and `_`
pub fn validate_profile_name(name: &str) -> Result<(), ConfigError> {
    if name.is_empty() || name.chars().count() > MAX_PROFILE_LEN {
        return Err(ConfigError::InvalidProfile(format!(
            "'{}' must be between 1 and {} characters",
            name, MAX_PROFILE_LEN
        )));
    }

    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '_')
    {
        return Err(ConfigError::InvalidProfile(format!(
            "'{}' may only contain letters, digits, '.' and '_'",
            name
        )));
    }

    Ok(())
}
