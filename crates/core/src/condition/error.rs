use thiserror::Error;

/// Errors that can occur while building a condition.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConditionError {
    #[error("Ordering must not be empty")]
    EmptyOrdering,
    #[error("Invalid ordering '{0}': expected a '+' or '-' prefix")]
    InvalidOrdering(String),
}

/// Result type for condition construction.
pub type Result<T> = std::result::Result<T, ConditionError>;
