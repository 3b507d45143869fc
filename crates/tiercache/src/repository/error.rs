use thiserror::Error;

use tiercache_core::cache::CacheError;
use tiercache_core::strategy::Strategy;

/// Misconfiguration detected while building a repository.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("No strategy configured")]
    MissingStrategy,
    #[error("No payload type declared")]
    MissingPayloadType,
    #[error("Declared payload type {declared} does not match the repository model {actual}")]
    PayloadTypeMismatch {
        declared: &'static str,
        actual: &'static str,
    },
    #[error("No upstream configured")]
    MissingUpstream,
    #[error("Strategy {strategy} needs a cache backend")]
    MissingBackend { strategy: Strategy },
    #[error("Page-append mode requires a list repository")]
    PageAppendRequiresList,
    #[error("Backend initialization failed: {0}")]
    BackendInit(#[from] CacheError),
}

/// Result type for repository construction.
pub type Result<T> = std::result::Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_strategy_display() {
        assert_eq!(ConfigError::MissingStrategy.to_string(), "No strategy configured");
    }

    #[test]
    fn test_missing_payload_type_display() {
        assert_eq!(
            ConfigError::MissingPayloadType.to_string(),
            "No payload type declared"
        );
    }

    #[test]
    fn test_payload_type_mismatch_display() {
        let error = ConfigError::PayloadTypeMismatch {
            declared: "app::Comment",
            actual: "app::Article",
        };
        assert_eq!(
            error.to_string(),
            "Declared payload type app::Comment does not match the repository model app::Article"
        );
    }

    #[test]
    fn test_missing_upstream_display() {
        assert_eq!(ConfigError::MissingUpstream.to_string(), "No upstream configured");
    }

    #[test]
    fn test_missing_backend_display() {
        let error = ConfigError::MissingBackend {
            strategy: Strategy::DatabaseCache,
        };
        assert_eq!(
            error.to_string(),
            "Strategy database-cache needs a cache backend"
        );
    }

    #[test]
    fn test_page_append_requires_list_display() {
        assert_eq!(
            ConfigError::PageAppendRequiresList.to_string(),
            "Page-append mode requires a list repository"
        );
    }

    #[test]
    fn test_backend_init_display() {
        let error = ConfigError::BackendInit(CacheError::InitFailed("table missing".to_string()));
        assert_eq!(
            error.to_string(),
            "Backend initialization failed: Cache initialization failed: table missing"
        );
    }
}
