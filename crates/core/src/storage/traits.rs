use async_trait::async_trait;

use crate::condition::Condition;

use super::Result;

/// Conditioned CRUD store: the object-mapper contract database backends sit on.
#[async_trait]
pub trait ConditionedStore<M>: Send + Sync {
    /// Prepares the store (e.g. creates the backing table). Must be idempotent.
    async fn prepare(&self) -> Result<()> {
        Ok(())
    }

    /// Inserts the given rows.
    async fn insert(&self, models: &[M]) -> Result<()>;

    /// Deletes every row matching the condition's predicate and window.
    async fn delete(&self, condition: &Condition) -> Result<()>;

    /// Selects rows matching the condition, honoring its ordering and window.
    async fn select(&self, condition: &Condition) -> Result<Vec<M>>;

    /// Counts rows matching the condition's predicate (ordering and window ignored).
    async fn count(&self, condition: &Condition) -> Result<i64>;
}

/// String-keyed binary object store.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Gets the bytes stored under a key.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Stores bytes under a key, replacing any previous value.
    async fn put(&self, key: &str, value: &[u8]) -> Result<()>;

    /// Removes the value stored under a key.
    async fn remove(&self, key: &str) -> Result<()>;
}

/// Connectivity probe consulted by the strategy selector.
pub trait Connectivity: Send + Sync {
    /// Returns true when the network can currently send and receive data.
    fn is_available(&self) -> bool;
}
