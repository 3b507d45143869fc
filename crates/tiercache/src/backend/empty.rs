use std::marker::PhantomData;

use async_trait::async_trait;

use tiercache_core::cache::{BackendKind, CacheBackend, Result};
use tiercache_core::condition::Condition;

/// Backend that never stores anything, used by network-only repositories.
#[derive(Debug)]
pub struct EmptyBackend<T> {
    _value: PhantomData<fn() -> T>,
}

impl<T> EmptyBackend<T> {
    pub fn new() -> Self {
        Self {
            _value: PhantomData,
        }
    }
}

impl<T> Default for EmptyBackend<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<T> CacheBackend<T> for EmptyBackend<T>
where
    T: Send + Sync + 'static,
{
    fn kind(&self) -> BackendKind {
        BackendKind::Custom
    }

    async fn init(&self) -> Result<()> {
        Ok(())
    }

    async fn query_cache(&self, _condition: &Condition) -> Result<Option<T>> {
        Ok(None)
    }

    async fn query_cache_size(&self, _condition: &Condition) -> Result<i64> {
        Ok(0)
    }

    async fn remove_old_cache(&self, _condition: &Condition) -> Result<()> {
        Ok(())
    }

    async fn add_new_cache(&self, _value: &T) -> Result<()> {
        Ok(())
    }
}
