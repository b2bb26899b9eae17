//! Error types for review-core

use thiserror::Error;

/// Errors raised while opening or reading the review stream
///
/// Any of these moves a session to `Errored`. Nothing here is retried
/// automatically; callers retry by starting the session again.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Connection could not be established
    #[error("Connection failed: {0}")]
    Connect(String),

    /// Backend answered with a non-success status
    #[error("Backend error: {status} {body}")]
    Status { status: u16, body: String },

    /// Stream dropped or failed mid-read
    #[error("Stream read failed: {0}")]
    Read(String),

    /// No chunk arrived within the configured idle window
    #[error("No data received for {0} seconds")]
    IdleTimeout(u64),

    /// Fixture file could not be read
    #[error("Fixture unavailable: {0}")]
    Fixture(String),

    /// Request could not be built
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() || err.is_timeout() {
            TransportError::Connect(err.to_string())
        } else if err.is_builder() {
            TransportError::InvalidRequest(err.to_string())
        } else {
            TransportError::Read(err.to_string())
        }
    }
}

/// A data line whose payload was not a valid event
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Malformed event payload ({reason}): {payload}")]
pub struct DecodeError {
    /// The payload text after the `data:` prefix
    pub payload: String,
    /// serde_json's description of the failure
    pub reason: String,
}

/// Errors loading or validating configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file exists but could not be read
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid TOML for this schema
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is outside its allowed range
    #[error("Invalid config value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}
