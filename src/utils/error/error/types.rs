//! Error types for the dispatch engine

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Result type alias for the dispatch engine
pub type Result<T> = std::result::Result<T, DispatchError>;

/// Tag attached to every failure surfaced by the engine.
///
/// The tag is what operators see in logs and what the status-code mapping in
/// the endpoint configuration resolves to, so it serializes in the same
/// `SCREAMING_SNAKE_CASE` form that appears in error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// Explicit throttling signal from upstream
    RateLimit,
    /// Upstream fault
    ServerError,
    /// Upstream is shedding load
    Overloaded,
    /// Request was malformed
    InvalidRequest,
    /// Credentials were rejected for this resource
    Permission,
    /// Endpoint or model does not exist
    NotFound,
    /// Request body exceeded upstream limits
    TooLarge,
    /// Status code with no configured mapping
    HttpError,
    /// Response parsed but did not have the expected shape
    StructureError,
    /// Response body could not be parsed at all
    ParseError,
    /// Connection-level failure before a status arrived
    NetworkError,
    /// Identifier space exhausted
    CapacityExceeded,
    /// Invalid configuration
    ConfigError,
    /// Run was cancelled
    Cancelled,
}

impl ErrorKind {
    /// The tag as it appears in logs and error messages
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::RateLimit => "RATE_LIMIT",
            ErrorKind::ServerError => "SERVER_ERROR",
            ErrorKind::Overloaded => "OVERLOADED",
            ErrorKind::InvalidRequest => "INVALID_REQUEST",
            ErrorKind::Permission => "PERMISSION",
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::TooLarge => "TOO_LARGE",
            ErrorKind::HttpError => "HTTP_ERROR",
            ErrorKind::StructureError => "STRUCTURE_ERROR",
            ErrorKind::ParseError => "PARSE_ERROR",
            ErrorKind::NetworkError => "NETWORK_ERROR",
            ErrorKind::CapacityExceeded => "CAPACITY_EXCEEDED",
            ErrorKind::ConfigError => "CONFIG_ERROR",
            ErrorKind::Cancelled => "CANCELLED",
        }
    }

    /// Client-class upstream failures point at a structural problem with the
    /// request rather than transient overload.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ErrorKind::InvalidRequest
                | ErrorKind::Permission
                | ErrorKind::NotFound
                | ErrorKind::TooLarge
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Main error type for the dispatch engine
#[derive(Error, Debug)]
pub enum DispatchError {
    /// Upstream answered with a non-success status
    #[error("{kind}: {message}")]
    Upstream {
        kind: ErrorKind,
        status: u16,
        message: String,
    },

    /// Response did not contain the expected envelope
    #[error("STRUCTURE_ERROR: {0}")]
    Structure(String),

    /// Response body or judgment text was not parseable
    #[error("PARSE_ERROR: {0}")]
    Parse(String),

    /// Connection-level failures
    #[error("NETWORK_ERROR: {0}")]
    Network(String),

    /// Identifier space exhausted
    #[error("CAPACITY_EXCEEDED: {0}")]
    CapacityExceeded(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Cancellation token fired
    #[error("CANCELLED: {0}")]
    Cancelled(String),
}
