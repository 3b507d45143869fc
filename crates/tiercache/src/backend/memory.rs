//! Memory tier: a process-wide LRU map of typed values keyed by cache name.

use std::any::Any;
use std::fmt;
use std::num::NonZeroUsize;
use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use lru::LruCache;
use tokio::sync::{OnceCell, RwLock};

use tiercache_core::cache::{BackendKind, CacheBackend, Result};
use tiercache_core::condition::Condition;

use crate::config::Config;

type SharedValue = Arc<dyn Any + Send + Sync>;

static GLOBAL: OnceLock<MemoryStore> = OnceLock::new();

/// Typed in-process cache with LRU eviction.
///
/// Values are stored as they are, without serialization, and read back by
/// cloning. Clones of a store share the same map.
#[derive(Clone)]
pub struct MemoryStore {
    entries: Arc<RwLock<LruCache<String, SharedValue>>>,
}

impl MemoryStore {
    /// Creates a store holding at most `max_entries` values. Zero is treated
    /// as one.
    pub fn new(max_entries: usize) -> Self {
        let capacity = NonZeroUsize::new(max_entries).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Arc::new(RwLock::new(LruCache::new(capacity))),
        }
    }

    /// The process-wide store, sized from `TIERCACHE_MEMORY_CAPACITY` on
    /// first use.
    pub fn global() -> Self {
        GLOBAL
            .get_or_init(|| Self::new(Config::from_env().memory_capacity))
            .clone()
    }

    /// Value cached under `name`, if present and of type `T`.
    pub async fn get<T>(&self, name: &str) -> Option<T>
    where
        T: Clone + 'static,
    {
        let mut entries = self.entries.write().await;
        let value = entries.get(name)?;
        match value.downcast_ref::<T>() {
            Some(value) => Some(value.clone()),
            None => {
                tracing::trace!(name, "Memory cache entry has a different type");
                None
            }
        }
    }

    pub async fn put<T>(&self, name: &str, value: T)
    where
        T: Send + Sync + 'static,
    {
        let mut entries = self.entries.write().await;
        entries.put(name.to_string(), Arc::new(value));
    }

    /// Removes the value under `name`, returning whether one was present.
    pub async fn remove(&self, name: &str) -> bool {
        self.entries.write().await.pop(name).is_some()
    }

    pub async fn contains(&self, name: &str) -> bool {
        self.entries.read().await.contains(name)
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

impl fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryStore").finish_non_exhaustive()
    }
}

/// Backend over one named slot of a [`MemoryStore`]. Conditions are ignored.
pub struct MemoryBackend<T> {
    store: MemoryStore,
    name: String,
    size: fn(&T) -> i64,
    ready: OnceCell<()>,
}

impl<M> MemoryBackend<M> {
    /// Backend caching one value; its size is 1 on a hit.
    pub fn single(store: MemoryStore, name: impl Into<String>) -> Self {
        Self {
            store,
            name: name.into(),
            size: |_| 1,
            ready: OnceCell::new(),
        }
    }
}

impl<M> MemoryBackend<Vec<M>> {
    /// Backend caching a list; its size is the list length.
    pub fn list(store: MemoryStore, name: impl Into<String>) -> Self {
        Self {
            store,
            name: name.into(),
            size: |models| i64::try_from(models.len()).unwrap_or(i64::MAX),
            ready: OnceCell::new(),
        }
    }
}

impl<T> MemoryBackend<T> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn store(&self) -> &MemoryStore {
        &self.store
    }
}

impl<T> fmt::Debug for MemoryBackend<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryBackend")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl<T> CacheBackend<T> for MemoryBackend<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn kind(&self) -> BackendKind {
        BackendKind::Memory
    }

    async fn init(&self) -> Result<()> {
        self.ready
            .get_or_init(|| async {
                tracing::trace!(name = %self.name, "Memory backend initialized");
            })
            .await;
        Ok(())
    }

    async fn query_cache(&self, _condition: &Condition) -> Result<Option<T>> {
        self.init().await?;
        Ok(self.store.get::<T>(&self.name).await)
    }

    async fn query_cache_size(&self, _condition: &Condition) -> Result<i64> {
        self.init().await?;
        Ok(self
            .store
            .get::<T>(&self.name)
            .await
            .map_or(0, |value| (self.size)(&value)))
    }

    async fn remove_old_cache(&self, _condition: &Condition) -> Result<()> {
        self.init().await?;
        self.store.remove(&self.name).await;
        Ok(())
    }

    async fn add_new_cache(&self, value: &T) -> Result<()> {
        self.init().await?;
        self.store.put(&self.name, value.clone()).await;
        Ok(())
    }
}
