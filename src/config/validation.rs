use url::Url;

use crate::error::{ConfigError, Result};

/// Centralized configuration validation utilities
pub struct ConfigValidator;

impl ConfigValidator {
    pub fn validate_url(url: &str, field_name: &str) -> Result<()> {
        let parsed = Url::parse(url).map_err(|e| {
            ConfigError::Validation(format!("Invalid {} URL '{}': {}", field_name, url, e))
        })?;

        if parsed.cannot_be_a_base() {
            return Err(ConfigError::Validation(format!(
                "Invalid {} URL '{}': no host",
                field_name, url
            ))
            .into());
        }
        Ok(())
    }

    pub fn validate_range<T>(value: T, min: T, max: T, field_name: &str) -> Result<()>
    where
        T: PartialOrd + std::fmt::Display + Copy,
    {
        if value < min || value > max {
            return Err(ConfigError::Validation(format!(
                "{} must be between {} and {}, got {}",
                field_name, min, max, value
            ))
            .into());
        }
        Ok(())
    }

    pub fn validate_redis_url(url: &str) -> Result<()> {
        if !url.starts_with("redis://") && !url.starts_with("rediss://") {
            return Err(ConfigError::Validation(format!(
                "Redis URL must start with 'redis://' or 'rediss://', got: {}",
                url
            ))
            .into());
        }

        Self::validate_url(url, "Redis")
    }
}
