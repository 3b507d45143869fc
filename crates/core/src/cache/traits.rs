use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::condition::Condition;

use super::Result;

/// Which physical backend a cache read targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    /// Conditioned SQL-style store.
    Database,
    /// Process-wide memory map.
    Memory,
    /// String-keyed binary object store.
    KvStore,
    /// Any other store supplied by the caller.
    Custom,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BackendKind::Database => "database",
            BackendKind::Memory => "memory",
            BackendKind::KvStore => "kv",
            BackendKind::Custom => "custom",
        };
        f.write_str(name)
    }
}

/// Uniform contract over every cache tier.
///
/// `T` is the cached value: the model itself for single-value repositories,
/// `Vec<M>` for list repositories. A miss is `Ok(None)`, never an error.
#[async_trait]
pub trait CacheBackend<T>: Send + Sync {
    /// The tier this backend implements.
    fn kind(&self) -> BackendKind;

    /// Establishes backend state. Calling it more than once has no further effect.
    async fn init(&self) -> Result<()>;

    /// Loads the cached value for a condition.
    async fn query_cache(&self, condition: &Condition) -> Result<Option<T>>;

    /// Counts cached records for a condition.
    async fn query_cache_size(&self, condition: &Condition) -> Result<i64>;

    /// Removes cached records for a condition.
    async fn remove_old_cache(&self, condition: &Condition) -> Result<()>;

    /// Adds a fresh value to the cache.
    async fn add_new_cache(&self, value: &T) -> Result<()>;
}

#[async_trait]
impl<T, B> CacheBackend<T> for Arc<B>
where
    T: Send + Sync + 'static,
    B: CacheBackend<T> + ?Sized,
{
    fn kind(&self) -> BackendKind {
        (**self).kind()
    }

    async fn init(&self) -> Result<()> {
        (**self).init().await
    }

    async fn query_cache(&self, condition: &Condition) -> Result<Option<T>> {
        (**self).query_cache(condition).await
    }

    async fn query_cache_size(&self, condition: &Condition) -> Result<i64> {
        (**self).query_cache_size(condition).await
    }

    async fn remove_old_cache(&self, condition: &Condition) -> Result<()> {
        (**self).remove_old_cache(condition).await
    }

    async fn add_new_cache(&self, value: &T) -> Result<()> {
        (**self).add_new_cache(value).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_kind_display() {
        assert_eq!(BackendKind::Database.to_string(), "database");
        assert_eq!(BackendKind::Memory.to_string(), "memory");
        assert_eq!(BackendKind::KvStore.to_string(), "kv");
        assert_eq!(BackendKind::Custom.to_string(), "custom");
    }
}
