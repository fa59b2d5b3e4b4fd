use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::debug;
use url::Url;

use crate::error::{ConfigError, Result};

pub mod env;
pub mod validation;

use env::{EnvParser, EnvVars};
use validation::ConfigValidator;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub db_host: String,
    pub db_port: u16,
    pub db_user: String,
    pub db_password: String,
    pub db_name: String,

    /// Full connection string, takes precedence over the `db_*` parts
    pub database_url: Option<String>,

    pub db_max_connections: u32,

    /// Redis host, no cache server when unset
    pub redis_host: Option<String>,
    pub redis_port: u16,
    pub redis_password: Option<String>,

    /// Full Redis URL, takes precedence over host, port and password
    pub redis_url: Option<String>,

    /// Lookup API base, e.g. `http://localhost:8081`
    pub api_url: String,
    /// Overrides the port of `api_url` when set
    pub api_port: Option<u16>,

    pub server_host: String,
    pub server_port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_host: "localhost".to_string(),
            db_port: 5432,
            db_user: "postgres".to_string(),
            db_password: String::new(),
            db_name: "songs".to_string(),
            database_url: None,
            db_max_connections: 10,
            redis_host: None,
            redis_port: 6379,
            redis_password: None,
            redis_url: None,
            api_url: "http://localhost:8081".to_string(),
            api_port: None,
            server_host: "0.0.0.0".to_string(),
            server_port: 8080,
        }
    }
}

impl Config {
    /// Defaults, then the TOML file at `config_path`, then the environment.
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        // .env is optional, real environment variables win over it
        dotenvy::dotenv().ok();

        let mut config = match config_path {
            Some(path) => Self::from_file(PathBuf::from(path))?,
            None => Self::default(),
        };

        config.load_from_env()?;
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: PathBuf) -> Result<Self> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound { path }.into());
        }
        debug!("Reading config from {}", path.display());
        let content = fs::read_to_string(&path)?;
        Ok(toml::from_str(&content)?)
    }

    fn load_from_env(&mut self) -> Result<()> {
        if let Some(host) = EnvParser::parse_string(EnvVars::DB_HOST, None)? {
            self.db_host = host;
        }
        if let Some(port) = EnvParser::parse_number(EnvVars::DB_PORT, 1u16, u16::MAX)? {
            self.db_port = port;
        }
        if let Some(user) = EnvParser::parse_string(EnvVars::DB_USER, None)? {
            self.db_user = user;
        }
        if let Some(password) = EnvParser::parse_string(EnvVars::DB_PASSWORD, None)? {
            self.db_password = password;
        }
        if let Some(name) = EnvParser::parse_string(EnvVars::DB_NAME, None)? {
            self.db_name = name;
        }
        if let Some(url) = EnvParser::parse_string(EnvVars::DATABASE_URL, None)? {
            self.database_url = Some(url);
        }
        if let Some(max) = EnvParser::parse_number(EnvVars::DB_MAX_CONNECTIONS, 1u32, 1000)? {
            self.db_max_connections = max;
        }

        if let Some(host) = EnvParser::parse_string(EnvVars::REDIS_HOST, None)? {
            self.redis_host = Some(host);
        }
        if let Some(port) = EnvParser::parse_number(EnvVars::REDIS_PORT, 1u16, u16::MAX)? {
            self.redis_port = port;
        }
        if let Some(password) = EnvParser::parse_string(EnvVars::REDIS_PASSWORD, None)? {
            self.redis_password = Some(password);
        }
        if let Some(url) = EnvParser::parse_string(EnvVars::REDIS_URL, Some(ConfigValidator::validate_redis_url))? {
            self.redis_url = Some(url);
        }

        if let Some(url) = EnvParser::parse_string(EnvVars::API_URL, None)? {
            self.api_url = url;
        }
        if let Some(port) = EnvParser::parse_number(EnvVars::API_PORT, 1u16, u16::MAX)? {
            self.api_port = Some(port);
        }

        if let Some(host) = EnvParser::parse_string(EnvVars::SERVER_HOST, None)? {
            self.server_host = host;
        }
        if let Some(port) = EnvParser::parse_number(EnvVars::SERVER_PORT, 1u16, u16::MAX)? {
            self.server_port = port;
        }

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        ConfigValidator::validate_range(self.db_max_connections, 1, 1000, "db_max_connections")?;
        ConfigValidator::validate_url(&self.database_url()?, "database")?;
        if let Some(url) = self.redis_url()? {
            ConfigValidator::validate_redis_url(&url)?;
        }
        self.api_base_url()?;
        self.server_addr()?;
        Ok(())
    }

    /// Postgres connection string, built from the `db_*` parts unless
    /// `database_url` is set.
    pub fn database_url(&self) -> Result<String> {
        if let Some(url) = &self.database_url {
            return Ok(url.clone());
        }

        let mut url = Url::parse(&format!("postgres://{}:{}", self.db_host, self.db_port))
            .map_err(|_| ConfigError::InvalidValue {
                field: "db_host".to_string(),
                value: self.db_host.clone(),
            })?;
        let invalid = |field: &str, value: &str| ConfigError::InvalidValue {
            field: field.to_string(),
            value: value.to_string(),
        };
        url.set_username(&self.db_user)
            .map_err(|_| invalid("db_user", &self.db_user))?;
        if !self.db_password.is_empty() {
            url.set_password(Some(&userinfo(&self.db_password)))
                .map_err(|_| invalid("db_password", "<hidden>"))?;
        }
        url.set_path(&format!("/{}", self.db_name));
        url.query_pairs_mut().append_pair("sslmode", "disable");

        Ok(url.to_string())
    }

    /// `None` means no Redis server, the in-memory cache is used instead.
    pub fn redis_url(&self) -> Result<Option<String>> {
        if let Some(url) = &self.redis_url {
            return Ok(Some(url.clone()));
        }
        let Some(host) = self.redis_host.as_deref() else {
            return Ok(None);
        };

        let invalid = |field: &str, value: &str| ConfigError::InvalidValue {
            field: field.to_string(),
            value: value.to_string(),
        };
        let mut url = Url::parse("redis://localhost").map_err(|_| invalid("redis_host", host))?;
        url.set_host(Some(host)).map_err(|_| invalid("redis_host", host))?;
        url.set_port(Some(self.redis_port))
            .map_err(|_| invalid("redis_port", &self.redis_port.to_string()))?;
        if let Some(password) = self.redis_password.as_deref() {
            url.set_password(Some(&userinfo(password)))
                .map_err(|_| invalid("redis_password", "<hidden>"))?;
        }

        Ok(Some(url.to_string()))
    }

    /// Lookup API base: `api_url`, with its port replaced by `api_port` when
    /// one is set.
    pub fn api_base_url(&self) -> Result<Url> {
        ConfigValidator::validate_url(&self.api_url, "lookup API")?;
        let invalid = |field: &str, value: String| ConfigError::InvalidValue {
            field: field.to_string(),
            value,
        };

        let mut url = Url::parse(&self.api_url).map_err(|_| invalid("api_url", self.api_url.clone()))?;
        if let Some(port) = self.api_port {
            url.set_port(Some(port))
                .map_err(|_| invalid("api_port", port.to_string()))?;
        }
        Ok(url)
    }

    pub fn server_addr(&self) -> Result<SocketAddr> {
        let raw = format!("{}:{}", self.server_host, self.server_port);
        raw.parse().map_err(|_| {
            ConfigError::InvalidValue {
                field: "server_host".to_string(),
                value: raw,
            }
            .into()
        })
    }
}

/// Percent-encodes a credential for the userinfo part of a URL.
///
/// `Url::set_password` leaves `%` alone, so a literal `%` would be decoded
/// by the client. Everything but unreserved characters is escaped here.
fn userinfo(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}
