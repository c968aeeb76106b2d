//! Helper functions for creating and inspecting errors

use super::types::{DispatchError, ErrorKind};

/// Helper functions for creating specific errors
impl DispatchError {
    pub fn upstream<S: Into<String>>(kind: ErrorKind, status: u16, message: S) -> Self {
        Self::Upstream {
            kind,
            status,
            message: message.into(),
        }
    }

    pub fn structure<S: Into<String>>(message: S) -> Self {
        Self::Structure(message.into())
    }

    pub fn parse<S: Into<String>>(message: S) -> Self {
        Self::Parse(message.into())
    }

    pub fn network<S: Into<String>>(message: S) -> Self {
        Self::Network(message.into())
    }

    pub fn capacity_exceeded<S: Into<String>>(message: S) -> Self {
        Self::CapacityExceeded(message.into())
    }

    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config(message.into())
    }

    pub fn cancelled<S: Into<String>>(message: S) -> Self {
        Self::Cancelled(message.into())
    }

    /// The tag for this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Upstream { kind, .. } => *kind,
            Self::Structure(_) => ErrorKind::StructureError,
            Self::Parse(_) => ErrorKind::ParseError,
            Self::Network(_) => ErrorKind::NetworkError,
            Self::CapacityExceeded(_) => ErrorKind::CapacityExceeded,
            Self::Config(_) => ErrorKind::ConfigError,
            Self::Cancelled(_) => ErrorKind::Cancelled,
        }
    }

    /// HTTP status that produced this error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Upstream { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the batch transport may try the same request again.
    ///
    /// Unmapped statuses are retried only when they are server-side (5xx).
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Upstream { kind, status, .. } => match kind {
                ErrorKind::RateLimit | ErrorKind::ServerError | ErrorKind::Overloaded => true,
                ErrorKind::HttpError => *status >= 500,
                _ => false,
            },
            Self::Parse(_) | Self::Network(_) => true,
            _ => false,
        }
    }
}
