//! Backends over a conditioned store.

use std::fmt;
use std::slice;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::OnceCell;

use tiercache_core::cache::{BackendKind, CacheBackend, CacheError, Result};
use tiercache_core::condition::Condition;
use tiercache_core::storage::ConditionedStore;

/// Shared state of the single and list database backends.
struct Inner<M> {
    store: Arc<dyn ConditionedStore<M>>,
    ready: OnceCell<()>,
}

impl<M> Inner<M> {
    fn new(store: Arc<dyn ConditionedStore<M>>) -> Self {
        Self {
            store,
            ready: OnceCell::new(),
        }
    }

    async fn init(&self) -> Result<()> {
        self.ready
            .get_or_try_init(|| async {
                self.store.prepare().await?;
                tracing::debug!("Database backend initialized");
                Ok::<(), CacheError>(())
            })
            .await
            .map(|_| ())
    }
}

/// Single-value database backend: a query yields the first selected row.
pub struct DatabaseBackend<M> {
    inner: Inner<M>,
}

impl<M> DatabaseBackend<M> {
    pub fn new(store: Arc<dyn ConditionedStore<M>>) -> Self {
        Self {
            inner: Inner::new(store),
        }
    }
}

impl<M> fmt::Debug for DatabaseBackend<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseBackend")
            .field("initialized", &self.inner.ready.initialized())
            .finish()
    }
}

#[async_trait]
impl<M> CacheBackend<M> for DatabaseBackend<M>
where
    M: Send + Sync + 'static,
{
    fn kind(&self) -> BackendKind {
        BackendKind::Database
    }

    async fn init(&self) -> Result<()> {
        self.inner.init().await
    }

    async fn query_cache(&self, condition: &Condition) -> Result<Option<M>> {
        self.init().await?;
        let rows = self.inner.store.select(condition).await?;
        Ok(rows.into_iter().next())
    }

    async fn query_cache_size(&self, condition: &Condition) -> Result<i64> {
        self.init().await?;
        Ok(self.inner.store.count(&condition.predicate_only()).await?)
    }

    async fn remove_old_cache(&self, condition: &Condition) -> Result<()> {
        self.init().await?;
        Ok(self.inner.store.delete(condition).await?)
    }

    async fn add_new_cache(&self, value: &M) -> Result<()> {
        self.init().await?;
        Ok(self.inner.store.insert(slice::from_ref(value)).await?)
    }
}

/// List database backend: a query yields every selected row, an empty
/// selection is a miss.
pub struct ListDatabaseBackend<M> {
    inner: Inner<M>,
}

impl<M> ListDatabaseBackend<M> {
    pub fn new(store: Arc<dyn ConditionedStore<M>>) -> Self {
        Self {
            inner: Inner::new(store),
        }
    }
}

impl<M> fmt::Debug for ListDatabaseBackend<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListDatabaseBackend")
            .field("initialized", &self.inner.ready.initialized())
            .finish()
    }
}

#[async_trait]
impl<M> CacheBackend<Vec<M>> for ListDatabaseBackend<M>
where
    M: Send + Sync + 'static,
{
    fn kind(&self) -> BackendKind {
        BackendKind::Database
    }

    async fn init(&self) -> Result<()> {
        self.inner.init().await
    }

    async fn query_cache(&self, condition: &Condition) -> Result<Option<Vec<M>>> {
        self.init().await?;
        let rows = self.inner.store.select(condition).await?;
        Ok(if rows.is_empty() { None } else { Some(rows) })
    }

    async fn query_cache_size(&self, condition: &Condition) -> Result<i64> {
        self.init().await?;
        Ok(self.inner.store.count(&condition.predicate_only()).await?)
    }

    async fn remove_old_cache(&self, condition: &Condition) -> Result<()> {
        self.init().await?;
        Ok(self.inner.store.delete(condition).await?)
    }

    async fn add_new_cache(&self, value: &Vec<M>) -> Result<()> {
        self.init().await?;
        Ok(self.inner.store.insert(value).await?)
    }
}
