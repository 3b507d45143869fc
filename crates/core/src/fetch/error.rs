use thiserror::Error;

use crate::cache::CacheError;
use crate::payload::PayloadMode;

/// Errors surfaced by a fetch, clear, or cache-size operation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// The upstream rejected its own request parameters.
    #[error("Invalid query parameters: {0}")]
    InvalidQuery(String),
    /// A single-value operation was invoked on a list repository or vice versa.
    #[error("{operation} requires a {expected} repository, this one is {actual}")]
    ModeMismatch {
        operation: &'static str,
        expected: PayloadMode,
        actual: PayloadMode,
    },
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),
    /// The network phase could not be started.
    #[error("Network dispatch failed: {0}")]
    Dispatch(String),
}

impl FetchError {
    /// Errors that must reach the caller even when the cache phase already
    /// produced a result.
    pub fn is_escalating(&self) -> bool {
        matches!(self, FetchError::InvalidQuery(_))
    }
}

/// Result type for fetch operations.
pub type Result<T> = std::result::Result<T, FetchError>;

/// Failure reported by the upstream data source.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Network request failed ({code}): {message}")]
pub struct NetworkError {
    pub code: i32,
    pub message: String,
}

impl NetworkError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}
