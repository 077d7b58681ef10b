//! Error Handling Infrastructure
//!
//! This module defines all error types used throughout Pantry.
//! Every error maps to a stable error code so failures can be reported uniformly.
//!
//! # Error Categories
//! - `ConnectionFailed`: Store unreachable, bad credentials (carries the native error code)
//! - `QueryFailed`: Statement execution errors
//! - `InvalidInput`: Malformed input, bad identifiers, over-long fields
//! - `NotConnected`: Operation attempted without an open connection
//! - `EngineError`: Engine-specific errors outside of a single statement
//! - `ConfigError`: Configuration file errors
//! - `Io`: Terminal I/O failures
//! - `Interrupted`: The user pressed Ctrl-C

use std::fmt;

use thiserror::Error;

/// Native error code reported by a database driver
///
/// MySQL reports numeric codes, PostgreSQL reports five-character SQLSTATE codes,
/// and SQLite reports extended result codes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NativeCode {
    Numeric(i64),
    SqlState(String),
}

impl fmt::Display for NativeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric(code) => write!(f, "{code}"),
            Self::SqlState(state) => f.write_str(state),
        }
    }
}

fn display_code(code: &Option<NativeCode>) -> String {
    code.as_ref().map_or_else(|| "-".to_string(), ToString::to_string)
}

/// Main error type for Pantry operations
#[derive(Error, Debug)]
pub enum PantryError {
    /// Database connection failed
    #[error("ERROR {}: {message}", display_code(.code))]
    ConnectionFailed { code: Option<NativeCode>, message: String },

    /// Statement execution failed
    #[error("Query execution failed: {0}")]
    QueryFailed(String),

    /// Invalid input or identifier
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// No connection is open
    #[error("Not connected to a database")]
    NotConnected,

    /// Engine-specific database error
    #[error("Engine error ({engine}): {detail}")]
    EngineError { engine: String, detail: String },

    /// Configuration error (file not found, invalid JSON, etc.)
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Terminal I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Interrupted by the user (Ctrl-C)
    #[error("Interrupted")]
    Interrupted,
}

impl PantryError {
    /// Convert error to a stable error code string
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::ConnectionFailed { .. } => "CONNECTION_FAILED",
            Self::QueryFailed(_) => "QUERY_FAILED",
            Self::InvalidInput(_) => "INVALID_INPUT",
            Self::NotConnected => "NOT_CONNECTED",
            Self::EngineError { .. } => "ENGINE_ERROR",
            Self::ConfigError(_) => "CONFIG_ERROR",
            Self::Io(_) => "IO_ERROR",
            Self::Interrupted => "INTERRUPTED",
        }
    }

    /// Get human-readable error message
    ///
    /// Messages never contain passwords.
    #[must_use]
    pub fn message(&self) -> String {
        self.to_string()
    }

    /// Create a connection failed error without a native code
    pub fn connection_failed(message: impl Into<String>) -> Self {
        Self::ConnectionFailed { code: None, message: message.into() }
    }

    /// Create a connection failed error carrying the driver's native code
    pub fn connection_failed_with_code(code: NativeCode, message: impl Into<String>) -> Self {
        Self::ConnectionFailed { code: Some(code), message: message.into() }
    }

    /// Create a query failed error
    pub fn query_failed(message: impl Into<String>) -> Self {
        Self::QueryFailed(message.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    /// Create an engine-specific error
    pub fn engine_error(engine: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::EngineError { engine: engine.into(), detail: detail.into() }
    }

    /// Create a configuration error
    pub fn config_error(message: impl Into<String>) -> Self {
        Self::ConfigError(message.into())
    }

    /// Whether this error means the user asked to stop
    #[must_use]
    pub const fn is_interrupt(&self) -> bool {
        matches!(self, Self::Interrupted)
    }
}

/// Result type alias for Pantry operations
pub type Result<T> = std::result::Result<T, PantryError>;
