//! Error Handling
//!
//! Unified error types for the engine.
//! Uses thiserror for ergonomic error definitions.

use thiserror::Error;

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Invalid input (missing argument, dimension mismatch, bad config)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Unknown symbol, missing file, absent old_text
    #[error("Not found: {0}")]
    NotFound(String),

    /// Path escapes the project root or matches the blocklist
    #[error("Safety error: {0}")]
    Safety(String),

    /// Embedding service, LLM provider, or shell command failure
    #[error("External error: {0}")]
    External(String),

    /// Unparsable action JSON, empty task list
    #[error("Parse error: {0}")]
    Parse(String),

    /// Iteration cap or timeout elapsed
    #[error("Exhausted: {0}")]
    Exhausted(String),

    /// SQLite errors (auto-converted from rusqlite::Error)
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for application errors
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a not found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a safety error
    pub fn safety(msg: impl Into<String>) -> Self {
        Self::Safety(msg.into())
    }

    /// Create an external failure error
    pub fn external(msg: impl Into<String>) -> Self {
        Self::External(msg.into())
    }

    /// Create a parse error
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    /// Create a resource exhaustion error
    pub fn exhausted(msg: impl Into<String>) -> Self {
        Self::Exhausted(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

/// Convert AppError to a plain string for tool/CLI payloads
impl From<AppError> for String {
    fn from(err: AppError) -> String {
        err.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AppError::not_found("symbol 'Frobnicate'");
        assert_eq!(err.to_string(), "Not found: symbol 'Frobnicate'");
    }

    #[test]
    fn test_error_conversion() {
        let err = AppError::safety("path escapes project root");
        let msg: String = err.into();
        assert!(msg.contains("Safety error"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let app_err: AppError = io_err.into();
        assert!(matches!(app_err, AppError::Io(_)));
    }
}
