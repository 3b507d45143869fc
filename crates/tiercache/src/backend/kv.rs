//! Backend over a string-keyed object store.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::OnceCell;

use tiercache_core::cache::{deserialize, serialize, BackendKind, CacheBackend, Result};
use tiercache_core::condition::Condition;
use tiercache_core::storage::ObjectStore;

/// Supplies the object-store key a repository caches under.
pub type KeyProvider = Arc<dyn Fn() -> String + Send + Sync>;

/// Caches one JSON-encoded value under a caller-supplied key. Conditions
/// are ignored.
pub struct KvBackend<T> {
    store: Arc<dyn ObjectStore>,
    key: KeyProvider,
    size: fn(&T) -> i64,
    ready: OnceCell<()>,
    _value: PhantomData<fn() -> T>,
}

impl<M> KvBackend<M> {
    pub fn single(store: Arc<dyn ObjectStore>, key: KeyProvider) -> Self {
        Self {
            store,
            key,
            size: |_| 1,
            ready: OnceCell::new(),
            _value: PhantomData,
        }
    }
}

impl<M> KvBackend<Vec<M>> {
    pub fn list(store: Arc<dyn ObjectStore>, key: KeyProvider) -> Self {
        Self {
            store,
            key,
            size: |models| i64::try_from(models.len()).unwrap_or(i64::MAX),
            ready: OnceCell::new(),
            _value: PhantomData,
        }
    }
}

impl<T> KvBackend<T> {
    /// The key the next operation will use.
    pub fn current_key(&self) -> String {
        (self.key)()
    }
}

impl<T> fmt::Debug for KvBackend<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KvBackend")
            .field("key", &self.current_key())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl<T> CacheBackend<T> for KvBackend<T>
where
    T: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    fn kind(&self) -> BackendKind {
        BackendKind::KvStore
    }

    async fn init(&self) -> Result<()> {
        self.ready
            .get_or_init(|| async {
                tracing::trace!(key = %self.current_key(), "KV backend initialized");
            })
            .await;
        Ok(())
    }

    async fn query_cache(&self, _condition: &Condition) -> Result<Option<T>> {
        self.init().await?;
        let key = self.current_key();
        let Some(bytes) = self.store.get(&key).await? else {
            tracing::trace!(%key, "KV cache miss");
            return Ok(None);
        };
        match deserialize(&bytes) {
            Ok(value) => {
                tracing::trace!(%key, "KV cache hit");
                Ok(Some(value))
            }
            Err(err) => {
                // Deserialization failed - treat as cache miss
                tracing::warn!(%key, error = %err, "KV cache entry deserialization failed");
                Ok(None)
            }
        }
    }

    async fn query_cache_size(&self, condition: &Condition) -> Result<i64> {
        Ok(self
            .query_cache(condition)
            .await?
            .map_or(0, |value| (self.size)(&value)))
    }

    async fn remove_old_cache(&self, _condition: &Condition) -> Result<()> {
        self.init().await?;
        Ok(self.store.remove(&self.current_key()).await?)
    }

    async fn add_new_cache(&self, value: &T) -> Result<()> {
        self.init().await?;
        let bytes = serialize(value)?;
        Ok(self.store.put(&self.current_key(), &bytes).await?)
    }
}
