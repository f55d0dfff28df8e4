//! Error types for the replication client.
//!
//! Errors are split along the recovery boundary: configuration and schema
//! errors terminate `run()`, everything else is handled inside the read loop
//! (reconnect or skip-and-continue) and never surfaces to the caller.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error categories for logging and telemetry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Invalid or unsupported primary configuration
    Configuration,
    /// Table/column introspection errors
    Schema,
    /// Wire protocol violations
    Protocol,
    /// Replication session errors
    Replication,
    /// State store errors
    State,
    /// Network errors
    Network,
    /// Other/unknown errors
    Other,
}

/// Errors surfaced by the replication client.
#[derive(Error, Debug)]
pub enum RelayError {
    /// Primary is misconfigured for row replication (version, binlog_format,
    /// checksum algorithm)
    #[error("configuration error: {0}")]
    Config(String),

    /// Schema discovery failed (unsupported type, missing collation)
    #[error("schema error: {0}")]
    Schema(String),

    /// Malformed packet or unexpected protocol response
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Replication session error
    #[error("replication error: {0}")]
    Replication(String),

    /// State store load/persist error
    #[error("state store error: {0}")]
    State(String),

    /// I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl RelayError {
    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new schema error
    pub fn schema(msg: impl Into<String>) -> Self {
        Self::Schema(msg.into())
    }

    /// Create a new protocol error
    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }

    /// Create a new replication error
    pub fn replication(msg: impl Into<String>) -> Self {
        Self::Replication(msg.into())
    }

    /// Create a new state store error
    pub fn state(msg: impl Into<String>) -> Self {
        Self::State(msg.into())
    }

    /// Create a generic error
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// Whether this error must terminate `run()`.
    ///
    /// Configuration and schema errors cannot be retried away; transport and
    /// session errors are handled by the reconnect path instead.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Config(_) | Self::Schema(_))
    }

    /// Get the error category for logging and telemetry.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Config(_) => ErrorCategory::Configuration,
            Self::Schema(_) => ErrorCategory::Schema,
            Self::Protocol(_) => ErrorCategory::Protocol,
            Self::Replication(_) => ErrorCategory::Replication,
            Self::State(_) => ErrorCategory::State,
            Self::Io(_) => ErrorCategory::Network,
            Self::Other(_) => ErrorCategory::Other,
        }
    }
}

/// Result type for replication operations
pub type Result<T> = std::result::Result<T, RelayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RelayError::config("binlog_format is STATEMENT");
        assert!(err.to_string().contains("configuration error"));
        assert!(err.to_string().contains("STATEMENT"));
    }

    #[test]
    fn test_fatal_classification() {
        assert!(RelayError::config("version too old").is_fatal());
        assert!(RelayError::schema("no collation").is_fatal());

        assert!(!RelayError::replication("lost connection").is_fatal());
        assert!(!RelayError::protocol("short packet").is_fatal());
        assert!(!RelayError::state("unwritable").is_fatal());
        assert!(!RelayError::other("x").is_fatal());
    }

    #[test]
    fn test_error_category() {
        assert_eq!(
            RelayError::config("x").category(),
            ErrorCategory::Configuration
        );
        assert_eq!(RelayError::schema("x").category(), ErrorCategory::Schema);
        assert_eq!(
            RelayError::replication("x").category(),
            ErrorCategory::Replication
        );
        assert_eq!(
            RelayError::Io(std::io::Error::other("x")).category(),
            ErrorCategory::Network
        );
    }
}
