//! List backend wrapper that remembers which conditions were written.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;

use tiercache_core::cache::{BackendKind, CacheBackend, Result};
use tiercache_core::condition::Condition;

/// Ordered, deduplicated record of the conditions used for additive writes.
#[derive(Debug, Default)]
pub struct Ledger {
    conditions: Mutex<Vec<Condition>>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `condition`. Returns false if it was already present.
    pub fn record(&self, condition: Condition) -> bool {
        let mut conditions = self
            .conditions
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if conditions.contains(&condition) {
            return false;
        }
        conditions.push(condition);
        true
    }

    pub fn conditions(&self) -> Vec<Condition> {
        self.conditions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn contains(&self, condition: &Condition) -> bool {
        self.conditions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(condition)
    }

    pub fn len(&self) -> usize {
        self.conditions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.conditions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

/// Any list backend plus the [`Ledger`] used by page-append refreshes.
pub struct ListBackend<M> {
    inner: Arc<dyn CacheBackend<Vec<M>>>,
    ledger: Ledger,
}

impl<M> ListBackend<M> {
    pub fn new(inner: Arc<dyn CacheBackend<Vec<M>>>) -> Self {
        Self {
            inner,
            ledger: Ledger::new(),
        }
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }
}

impl<M: Send + Sync + 'static> ListBackend<M> {
    /// Removes the cache of every ledgered condition and of `current`.
    ///
    /// Ledger entries are kept; the caller records `current` once the fresh
    /// data is written.
    pub async fn invalidate_all(&self, current: &Condition) -> Result<()> {
        let conditions = self.ledger.conditions();
        for condition in &conditions {
            self.inner.remove_old_cache(condition).await?;
        }
        if !conditions.contains(current) {
            self.inner.remove_old_cache(current).await?;
        }
        tracing::debug!(ledgered = conditions.len(), "Invalidated ledgered pages");
        Ok(())
    }
}

impl<M> fmt::Debug for ListBackend<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListBackend")
            .field("kind", &self.inner.kind())
            .field("ledger", &self.ledger.len())
            .finish()
    }
}

#[async_trait]
impl<M> CacheBackend<Vec<M>> for ListBackend<M>
where
    M: Send + Sync + 'static,
{
    fn kind(&self) -> BackendKind {
        self.inner.kind()
    }

    async fn init(&self) -> Result<()> {
        self.inner.init().await
    }

    async fn query_cache(&self, condition: &Condition) -> Result<Option<Vec<M>>> {
        self.inner.query_cache(condition).await
    }

    async fn query_cache_size(&self, condition: &Condition) -> Result<i64> {
        self.inner.query_cache_size(condition).await
    }

    async fn remove_old_cache(&self, condition: &Condition) -> Result<()> {
        self.inner.remove_old_cache(condition).await
    }

    async fn add_new_cache(&self, value: &Vec<M>) -> Result<()> {
        self.inner.add_new_cache(value).await
    }
}
