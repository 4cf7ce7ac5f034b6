use crate::config::{AppConfig, RedisConfig, TierConfig, TierPolicy};
use crate::errors::{RateLimitError, Result};
use std::collections::HashSet;
use tracing::{debug, warn};

/// Validate the entire application configuration
pub fn validate_config(config: &AppConfig) -> Result<()> {
    debug!("Validating configuration...");

    validate_redis_config(&config.redis)?;
    validate_tier_config(&config.tiers)?;

    debug!("Configuration validation successful");
    Ok(())
}

/// Validate Redis configuration
fn validate_redis_config(config: &RedisConfig) -> Result<()> {
    if config.url.is_empty() {
        return Err(RateLimitError::ConfigurationError(
            "Redis URL cannot be empty".to_string(),
        ));
    }

    if !config.url.starts_with("redis://") && !config.url.starts_with("rediss://") {
        return Err(RateLimitError::ConfigurationError(format!(
            "Invalid Redis URL format: {}. Must start with redis:// or rediss://",
            config.url
        )));
    }

    if config.max_connections == 0 {
        return Err(RateLimitError::ConfigurationError(
            "max_connections must be greater than 0".to_string(),
        ));
    }

    if config.max_connections > 1000 {
        warn!(
            "max_connections is very high ({}). This may consume excessive resources.",
            config.max_connections
        );
    }

    if config.connection_timeout_secs == 0 {
        return Err(RateLimitError::ConfigurationError(
            "connection_timeout_secs must be greater than 0".to_string(),
        ));
    }

    if config.command_timeout_secs == 0 {
        return Err(RateLimitError::ConfigurationError(
            "command_timeout_secs must be greater than 0".to_string(),
        ));
    }

    debug!("Redis configuration valid");
    Ok(())
}

/// Validate the tier table
fn validate_tier_config(config: &TierConfig) -> Result<()> {
    if config.tiers.is_empty() {
        return Err(RateLimitError::ConfigurationError(
            "Tier table must define at least one tier".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for tier in &config.tiers {
        validate_tier_policy(tier)?;

        if !seen.insert(tier.name.as_str()) {
            return Err(RateLimitError::InvalidTier(format!(
                "Tier '{}' is defined more than once",
                tier.name
            )));
        }
    }

    if !seen.contains(config.fallback.as_str()) {
        return Err(RateLimitError::ConfigurationError(format!(
            "Fallback tier '{}' is not defined in the tier table",
            config.fallback
        )));
    }

    debug!("Tier configuration valid ({} tiers)", config.tiers.len());
    Ok(())
}

/// Validate an individual tier policy
fn validate_tier_policy(policy: &TierPolicy) -> Result<()> {
    if policy.name.is_empty() {
        return Err(RateLimitError::InvalidTier(
            "Tier name cannot be empty".to_string(),
        ));
    }

    if policy.rate <= 0.0 {
        return Err(RateLimitError::InvalidTier(format!(
            "rate must be positive for tier '{}' (got {})",
            policy.name, policy.rate
        )));
    }

    if policy.burst < 1 {
        return Err(RateLimitError::InvalidTier(format!(
            "burst must be at least 1 for tier '{}' (got {})",
            policy.name, policy.burst
        )));
    }

    if policy.period <= 0.0 {
        return Err(RateLimitError::InvalidTier(format!(
            "period must be positive for tier '{}' (got {})",
            policy.name, policy.period
        )));
    }

    // Sanity checks that are legal but usually misconfigurations.
    if policy.fill_rate() > 1_000_000.0 {
        warn!(
            "Very high fill rate ({:.0}/s) for tier '{}'",
            policy.fill_rate(),
            policy.name
        );
    }

    let seconds_to_fill = policy.burst as f64 / policy.fill_rate();
    if seconds_to_fill > 86400.0 {
        warn!(
            "Burst for tier '{}' takes {:.2} hours to refill at the configured rate",
            policy.name,
            seconds_to_fill / 3600.0
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FailurePolicy;

    fn policy(name: &str, rate: f64, burst: i64, period: f64) -> TierPolicy {
        TierPolicy {
            name: name.to_string(),
            rate,
            burst,
            period,
        }
    }

    #[test]
    fn test_validate_valid_config() {
        let config = AppConfig {
            redis: RedisConfig::default(),
            tiers: TierConfig::default(),
            failure_policy: FailurePolicy::Open,
        };

        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validate_invalid_redis_url() {
        let mut config = AppConfig {
            redis: RedisConfig::default(),
            tiers: TierConfig::default(),
            failure_policy: FailurePolicy::Open,
        };

        config.redis.url = "invalid_url".to_string();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_zero_rate() {
        assert!(validate_tier_policy(&policy("test", 0.0, 10, 60.0)).is_err());
    }

    #[test]
    fn test_validate_zero_burst() {
        assert!(validate_tier_policy(&policy("test", 5.0, 0, 60.0)).is_err());
    }

    #[test]
    fn test_validate_zero_period() {
        assert!(validate_tier_policy(&policy("test", 5.0, 10, 0.0)).is_err());
    }

    #[test]
    fn test_validate_duplicate_tier_names() {
        let config = TierConfig {
            tiers: vec![
                policy("anonymous", 2.0, 2, 60.0),
                policy("anonymous", 5.0, 10, 60.0),
            ],
            fallback: "anonymous".to_string(),
        };

        assert!(validate_tier_config(&config).is_err());
    }

    #[test]
    fn test_validate_missing_fallback() {
        let config = TierConfig {
            tiers: vec![policy("free", 5.0, 10, 60.0)],
            fallback: "anonymous".to_string(),
        };

        assert!(validate_tier_config(&config).is_err());
    }
}
