use thiserror::Error;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum PagerError {
    #[error("Page size must be greater than zero")]
    ZeroPageSize,
}

/// Result type for pager operations.
pub type Result<T> = std::result::Result<T, PagerError>;
