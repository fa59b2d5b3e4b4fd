//! Error handling for the song catalog service
//!
//! This module provides a hierarchical error system. Every layer (store,
//! cache, metadata lookup, configuration) has its own typed error which is
//! lifted into [`SongError`]. The HTTP boundary only needs
//! [`SongError::status_code`] to decide how a failure is reported.

use std::path::PathBuf;
use thiserror::Error;

/// HTTP status class of a [`SongError`].
pub const STATUS_BAD_REQUEST: u16 = 400;
pub const STATUS_INTERNAL_SERVER_ERROR: u16 = 500;

#[derive(Error, Debug)]
pub enum SongError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Store(#[from] StoreError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Request error: {0}")]
    Request(#[from] RequestError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Connection failed: {0}")]
    Connection(#[source] sqlx::Error),

    #[error("Query failed: {0}")]
    Query(#[source] sqlx::Error),

    #[error("Failed to decode row: {0}")]
    Decode(#[source] sqlx::Error),

    #[error("Query timed out after {seconds}s")]
    Timeout { seconds: u64 },

    #[error("Migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Redis query failed: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Cache connection is closed")]
    Closed,
}

/// Failures of the external metadata lookup, one variant per phase.
#[derive(Error, Debug)]
pub enum RequestError {
    #[error("error creating request - {0}")]
    Build(String),

    #[error("error making request - {0}")]
    Execute(#[source] reqwest::Error),

    #[error("error decoding response - {0}")]
    Decode(#[source] reqwest::Error),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Invalid config format: {0}")]
    InvalidFormat(#[from] toml::de::Error),

    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: String, value: String },

    #[error("{0}")]
    Validation(String),
}

pub type Result<T> = std::result::Result<T, SongError>;

impl SongError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        SongError::InvalidInput(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        SongError::NotFound(message.into())
    }

    /// HTTP status class this error is reported with.
    ///
    /// A missing row is a bad request in this service, not a 404.
    pub fn status_code(&self) -> u16 {
        match self {
            SongError::InvalidInput(_) | SongError::NotFound(_) => STATUS_BAD_REQUEST,
            SongError::Store(_)
            | SongError::Cache(_)
            | SongError::Request(_)
            | SongError::Config(_)
            | SongError::Internal(_) => STATUS_INTERNAL_SERVER_ERROR,
        }
    }

    pub fn is_client_error(&self) -> bool {
        self.status_code() == STATUS_BAD_REQUEST
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => StoreError::Connection(err),
            sqlx::Error::ColumnDecode { .. }
            | sqlx::Error::ColumnNotFound(_)
            | sqlx::Error::Decode(_) => StoreError::Decode(err),
            _ => StoreError::Query(err),
        }
    }
}

impl From<sqlx::Error> for SongError {
    fn from(err: sqlx::Error) -> Self {
        SongError::Store(err.into())
    }
}

impl From<redis::RedisError> for SongError {
    fn from(err: redis::RedisError) -> Self {
        SongError::Cache(CacheError::Redis(err))
    }
}

impl From<toml::de::Error> for SongError {
    fn from(err: toml::de::Error) -> Self {
        SongError::Config(ConfigError::InvalidFormat(err))
    }
}

impl From<std::io::Error> for SongError {
    fn from(err: std::io::Error) -> Self {
        SongError::Internal(err.into())
    }
}
