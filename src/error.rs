//! Error types for dirsearch
//!
//! This module defines the error hierarchy for the entire crate.
//! All public APIs return `Result<T, Error>` where Error is defined here.

use thiserror::Error;

/// The main error type for dirsearch
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Client Input Errors
    // ============================================================================
    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Session not found or expired: {session_id}")]
    SessionNotFound { session_id: String },

    #[error("Page {page} is out of range (total pages: {total_pages})")]
    OutOfRange { page: u32, total_pages: u32 },

    // ============================================================================
    // Provider Errors
    // ============================================================================
    #[error("Directory {operation} failed for partition '{partition}': {message}")]
    Provider {
        partition: String,
        operation: String,
        message: String,
    },

    #[error("Directory {operation} timed out for partition '{partition}' after {timeout_ms}ms")]
    ProviderTimeout {
        partition: String,
        operation: String,
        timeout_ms: u64,
    },

    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    // ============================================================================
    // Export Errors
    // ============================================================================
    #[error("Export error: {message}")]
    Export { message: String },

    // ============================================================================
    // I/O Errors
    // ============================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ============================================================================
    // Generic Errors
    // ============================================================================
    #[error("{0}")]
    Other(String),
}

/// Coarse error classes surfaced at the service boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed filter, partition, page size or page number
    Validation,
    /// Unknown or expired session
    NotFound,
    /// Page index beyond the current or estimated bound
    OutOfRange,
    /// The directory dependency failed or timed out
    Provider,
    /// Everything else
    Internal,
}

impl Error {
    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a session-not-found error
    pub fn session_not_found(session_id: impl Into<String>) -> Self {
        Self::SessionNotFound {
            session_id: session_id.into(),
        }
    }

    /// Create an out-of-range error
    pub fn out_of_range(page: u32, total_pages: u32) -> Self {
        Self::OutOfRange { page, total_pages }
    }

    /// Create a provider error
    pub fn provider(
        partition: impl Into<String>,
        operation: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Provider {
            partition: partition.into(),
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Create a provider timeout error
    pub fn provider_timeout(
        partition: impl Into<String>,
        operation: impl Into<String>,
        timeout_ms: u64,
    ) -> Self {
        Self::ProviderTimeout {
            partition: partition.into(),
            operation: operation.into(),
            timeout_ms,
        }
    }

    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an export error
    pub fn export(message: impl Into<String>) -> Self {
        Self::Export {
            message: message.into(),
        }
    }

    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Validation { .. } => ErrorKind::Validation,
            Error::SessionNotFound { .. } => ErrorKind::NotFound,
            Error::OutOfRange { .. } => ErrorKind::OutOfRange,
            Error::Provider { .. } | Error::ProviderTimeout { .. } => ErrorKind::Provider,
            _ => ErrorKind::Internal,
        }
    }

    /// Check if this error was caused by client input
    pub fn is_client_error(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Validation | ErrorKind::NotFound | ErrorKind::OutOfRange
        )
    }
}

/// Result type alias for dirsearch
pub type Result<T> = std::result::Result<T, Error>;

/// Extension trait for adding context to errors
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, message: impl Into<String>) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", message.into(), inner))
        })
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", f(), inner))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::validation("bad filter");
        assert_eq!(err.to_string(), "Validation error: bad filter");

        let err = Error::out_of_range(4, 3);
        assert_eq!(
            err.to_string(),
            "Page 4 is out of range (total pages: 3)"
        );

        let err = Error::provider("OU=Staff,DC=example,DC=com", "search", "busy");
        assert_eq!(
            err.to_string(),
            "Directory search failed for partition 'OU=Staff,DC=example,DC=com': busy"
        );
    }

    #[test]
    fn test_error_kind() {
        assert_eq!(Error::validation("x").kind(), ErrorKind::Validation);
        assert_eq!(Error::session_not_found("abc").kind(), ErrorKind::NotFound);
        assert_eq!(Error::out_of_range(2, 1).kind(), ErrorKind::OutOfRange);
        assert_eq!(Error::provider("p", "count", "x").kind(), ErrorKind::Provider);
        assert_eq!(
            Error::provider_timeout("p", "search", 10).kind(),
            ErrorKind::Provider
        );
        assert_eq!(Error::config("x").kind(), ErrorKind::Internal);
    }

    #[test]
    fn test_is_client_error() {
        assert!(Error::validation("x").is_client_error());
        assert!(Error::session_not_found("abc").is_client_error());
        assert!(Error::out_of_range(2, 1).is_client_error());

        assert!(!Error::provider("p", "search", "x").is_client_error());
        assert!(!Error::export("x").is_client_error());
    }

    #[test]
    fn test_result_context() {
        let result: Result<()> = Err(Error::config("inner"));
        let with_context = result.context("outer");
        assert!(with_context
            .unwrap_err()
            .to_string()
            .contains("outer: Configuration error: inner"));
    }
}
