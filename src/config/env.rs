use std::env;
use std::fmt::Display;
use std::str::FromStr;

use crate::error::{ConfigError, Result};

/// Environment variable names, as used by the deployment's `.env`
pub struct EnvVars;

impl EnvVars {
    pub const DB_HOST: &'static str = "DB_HOST";
    pub const DB_PORT: &'static str = "DB_PORT";
    pub const DB_USER: &'static str = "DB_USER";
    pub const DB_PASSWORD: &'static str = "DB_PASSWORD";
    pub const DB_NAME: &'static str = "DB_NAME";
    pub const DATABASE_URL: &'static str = "DATABASE_URL";
    pub const DB_MAX_CONNECTIONS: &'static str = "DB_MAX_CONNECTIONS";

    pub const REDIS_HOST: &'static str = "REDIS_HOST";
    pub const REDIS_PORT: &'static str = "REDIS_PORT";
    pub const REDIS_PASSWORD: &'static str = "REDIS_PASSWORD";
    pub const REDIS_URL: &'static str = "REDIS_URL";

    pub const API_URL: &'static str = "API_URL";
    pub const API_PORT: &'static str = "API_PORT";

    pub const SERVER_HOST: &'static str = "SERVER_HOST";
    pub const SERVER_PORT: &'static str = "SERVER_PORT";
}

/// Environment variable parsing utilities with validation
pub struct EnvParser;

impl EnvParser {
    /// Trimmed value of `var_name`; unset and blank are both `None`.
    pub fn parse_string(var_name: &str, validator: Option<fn(&str) -> Result<()>>) -> Result<Option<String>> {
        match env::var(var_name) {
            Ok(value) => {
                let trimmed = value.trim().to_string();
                if trimmed.is_empty() {
                    return Ok(None);
                }

                if let Some(validate_fn) = validator {
                    validate_fn(&trimmed)?;
                }

                Ok(Some(trimmed))
            }
            Err(env::VarError::NotPresent) => Ok(None),
            Err(env::VarError::NotUnicode(_)) => Err(ConfigError::Validation(format!(
                "Environment variable {} contains invalid UTF-8",
                var_name
            ))
            .into()),
        }
    }

    /// Parse a number within `min..=max`
    pub fn parse_number<T>(var_name: &str, min: T, max: T) -> Result<Option<T>>
    where
        T: FromStr + PartialOrd + Display + Copy,
    {
        let Some(value_str) = Self::parse_string(var_name, None)? else {
            return Ok(None);
        };

        let value = value_str.parse::<T>().map_err(|_| {
            ConfigError::Validation(format!(
                "Invalid number in {}: '{}'. Must be a positive integer",
                var_name, value_str
            ))
        })?;

        if value < min || value > max {
            return Err(ConfigError::Validation(format!(
                "Value in {} must be between {} and {}, got {}",
                var_name, min, max, value
            ))
            .into());
        }

        Ok(Some(value))
    }
}
