//! Error types for mealiesync.
//!
//! Library crates use [`MealieSyncError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;
use std::time::Duration;

/// Top-level error type for all mealiesync operations.
#[derive(Debug, thiserror::Error)]
pub enum MealieSyncError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Transport-level failure talking to the recipe store.
    #[error("network error: {0}")]
    Network(String),

    /// The recipe store answered with a non-success status.
    #[error("unexpected status code {status}: {body}")]
    Http { status: u16, body: String },

    /// A response body did not match the expected schema.
    #[error("decode error: {message}")]
    Decode { message: String },

    /// A single store call exceeded its deadline.
    #[error("{operation} timed out after {timeout:?}")]
    Timeout {
        operation: String,
        timeout: Duration,
    },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Invalid input (bad URL, unsupported value, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, MealieSyncError>;

impl MealieSyncError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a decode error from any displayable message.
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Create a timeout error for the named operation.
    pub fn timeout(operation: impl Into<String>, timeout: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            timeout,
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = MealieSyncError::config("timeout-secs must not be 0");
        assert_eq!(err.to_string(), "config error: timeout-secs must not be 0");

        let err = MealieSyncError::Http {
            status: 404,
            body: "not found".into(),
        };
        assert_eq!(err.to_string(), "unexpected status code 404: not found");
    }

    #[test]
    fn timeout_names_operation() {
        let err = MealieSyncError::timeout("fetch recipe cake", Duration::from_secs(5));
        let msg = err.to_string();
        assert!(msg.contains("fetch recipe cake"));
        assert!(msg.contains("5s"));
    }
}
