// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Error types for Heijastus
//!
//! Two layers: [`Error`] is returned by fallible setup and I/O (config
//! validation, client construction, report export); [`TransportError`] is
//! recorded on a single probe result and never aborts a running scan.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for Heijastus operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for Heijastus
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// URL parsing failed
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// Configuration error, raised before any probe is dispatched
    #[error("Configuration error: {0}")]
    Config(String),

    /// Header or cookie that cannot be put on the wire
    #[error("Invalid header '{name}': {reason}")]
    InvalidHeader { name: String, reason: String },

    /// Timeout error
    #[error("Operation timed out after {duration_ms}ms: {operation}")]
    Timeout {
        operation: String,
        duration_ms: u64,
        url: Option<String>,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a configuration error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Error::Config(msg.into())
    }

    /// Create an invalid header error
    pub fn invalid_header(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::InvalidHeader {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Create a timeout error with URL
    pub fn timeout_with_url(
        operation: impl Into<String>,
        duration_ms: u64,
        url: impl Into<String>,
    ) -> Self {
        Error::Timeout {
            operation: operation.into(),
            duration_ms,
            url: Some(url.into()),
        }
    }

    /// Create a generic error
    pub fn other<S: Into<String>>(msg: S) -> Self {
        Error::Other(msg.into())
    }

    /// Check if this is a timeout error
    pub fn is_timeout(&self) -> bool {
        match self {
            Error::Timeout { .. } => true,
            Error::Http(e) => e.is_timeout(),
            _ => false,
        }
    }

    /// Check if this error was raised while validating configuration
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            Error::Config(_) | Error::InvalidHeader { .. } | Error::Url(_)
        )
    }

    /// Get URL if available
    pub fn url(&self) -> Option<&str> {
        match self {
            Error::Timeout { url: Some(u), .. } => Some(u),
            Error::Http(e) => e.url().map(|u| u.as_str()),
            _ => None,
        }
    }
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Other(s)
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Other(s.to_string())
    }
}

/// Helper trait for adding context to errors
pub trait ErrorContext<T> {
    /// Add operation context to error
    fn context(self, msg: &str) -> Result<T>;
}

impl<T, E: Into<Error>> ErrorContext<T> for std::result::Result<T, E> {
    fn context(self, msg: &str) -> Result<T> {
        self.map_err(|e| {
            let err = e.into();
            Error::Other(format!("{}: {}", msg, err))
        })
    }
}

/// Failure of a single probe's network exchange
///
/// Carried on the probe's result. Holds rendered messages rather than the
/// source error so results stay `Clone` and serializable.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "kebab-case")]
pub enum TransportError {
    /// Network call or result collection exceeded its deadline
    #[error("timed out after {duration_ms}ms")]
    Timeout { duration_ms: u64 },

    /// DNS resolution or TCP/TLS connect failed
    #[error("connection failed: {0}")]
    Connect(String),

    /// Request or response violated the protocol, or the body could not be read
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Request could not be built from the probe
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Worker task panicked or was cancelled before producing an outcome
    #[error("probe task aborted: {0}")]
    Aborted(String),
}

impl TransportError {
    /// Classify a reqwest failure
    pub fn from_reqwest(err: &reqwest::Error, timeout_ms: u64) -> Self {
        if err.is_timeout() {
            TransportError::Timeout {
                duration_ms: timeout_ms,
            }
        } else if err.is_connect() {
            TransportError::Connect(err.to_string())
        } else if err.is_builder() {
            TransportError::InvalidRequest(err.to_string())
        } else {
            TransportError::Protocol(err.to_string())
        }
    }

    /// Convert a crate error raised while performing a probe
    pub fn from_error(err: &Error, timeout_ms: u64) -> Self {
        match err {
            Error::Http(e) => Self::from_reqwest(e, timeout_ms),
            Error::Timeout { duration_ms, .. } => TransportError::Timeout {
                duration_ms: *duration_ms,
            },
            Error::Url(_) | Error::Config(_) | Error::InvalidHeader { .. } => {
                TransportError::InvalidRequest(err.to_string())
            }
            other => TransportError::Protocol(other.to_string()),
        }
    }

    /// Check if this is a timeout
    pub fn is_timeout(&self) -> bool {
        matches!(self, TransportError::Timeout { .. })
    }
}
