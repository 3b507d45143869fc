use std::collections::HashMap;
use std::fmt;
use std::slice;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use futures_util::StreamExt;
use tokio::runtime::Handle;

use tiercache_core::cache::{self, BackendKind, CacheBackend};
use tiercache_core::condition::Condition;
use tiercache_core::fetch::{self, FetchError, LoadEvent, NetworkError, NetworkResult};
use tiercache_core::sink::{Sink, SinkKind};
use tiercache_core::strategy::{select_data, DataSource, Provenance};

use crate::backend::MemoryBackend;
use crate::repository::Model;

use super::FetchContext;

/// Resolves a single value into a `K::Slot<Option<M>>`.
pub struct SingleFetcher<M: Model, K: SinkKind> {
    inner: Arc<Inner<M, K>>,
}

struct Inner<M: Model, K: SinkKind> {
    context: FetchContext<M>,
    backend: Arc<dyn CacheBackend<M>>,
    memory: Option<MemoryBackend<M>>,
    sink: K::Slot<Option<M>>,
    mapped: Mutex<HashMap<String, M>>,
}

impl<M: Model, K: SinkKind> Clone for SingleFetcher<M, K> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<M: Model, K: SinkKind> fmt::Debug for SingleFetcher<M, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SingleFetcher")
            .field("repository", &self.inner.context.config.label())
            .field("backend", &self.inner.backend.kind())
            .field("memory", &self.inner.memory.is_some())
            .finish()
    }
}

impl<M: Model, K: SinkKind> SingleFetcher<M, K> {
    pub(crate) fn new(
        context: FetchContext<M>,
        backend: Arc<dyn CacheBackend<M>>,
        memory: Option<MemoryBackend<M>>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                context,
                backend,
                memory,
                sink: <K::Slot<Option<M>> as Sink<Option<M>>>::empty(),
                mapped: Mutex::new(HashMap::new()),
            }),
        }
    }

    pub(crate) fn sink(&self) -> &K::Slot<Option<M>> {
        &self.inner.sink
    }

    pub(crate) fn backend(&self) -> &Arc<dyn CacheBackend<M>> {
        &self.inner.backend
    }

    pub(crate) fn query(&self) -> Condition {
        self.inner.context.upstream.query()
    }

    pub(crate) fn mapped(&self, key: &str) -> Option<M> {
        self.inner
            .mapped
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    /// Runs the configured strategy and returns the sink it publishes into.
    pub(crate) async fn fetch(&self) -> fetch::Result<&K::Slot<Option<M>>> {
        let context = &self.inner.context;
        let selection = select_data(
            context.config.strategy,
            self.inner.backend.kind(),
            context.connectivity.as_ref(),
            self,
        )
        .await?;

        if !selection.loaded {
            self.inner.sink.reset();
            context.emit(LoadEvent::other_failure());
        }
        Ok(&self.inner.sink)
    }

    pub(crate) fn clear(&self) {
        self.inner.sink.reset();
    }

    fn publish(&self, model: M) {
        let context = &self.inner.context;
        context.log_models(slice::from_ref(&model));
        self.inner.sink.publish(Some(model.clone()));
        context.relay(model);
    }

    async fn run_network(self) {
        let upstream = Arc::clone(&self.inner.context.upstream);
        match upstream.load().await {
            Some(result) => self.complete(result).await,
            None => {
                let mut results = upstream.load_stream();
                while let Some(result) = results.next().await {
                    self.complete(result).await;
                }
            }
        }
    }

    async fn complete(&self, result: NetworkResult<M>) {
        match result {
            Ok(model) => self.parse(model).await,
            Err(err) => self.fail(&err).await,
        }
    }

    async fn parse(&self, mut model: M) {
        let context = &self.inner.context;
        context
            .upstream
            .intercept(Provenance::Network, &mut model);

        if !context.params_valid("parse") {
            context.emit(LoadEvent::network_failure());
            return;
        }

        let published = match self.store(&model).await {
            Ok(published) => published,
            Err(err) => {
                tracing::warn!(
                    repository = %context.config.label(),
                    error = %err,
                    "Failed to cache network result"
                );
                context.emit(LoadEvent::network_failure());
                return;
            }
        };

        if let Some(model) = published {
            self.publish(model);
        } else {
            self.inner.sink.reset();
        }
        context.emit(LoadEvent::network_success());
    }

    /// Replaces the cached value for the current condition and returns the
    /// value the sink should show.
    async fn store(&self, model: &M) -> cache::Result<Option<M>> {
        let context = &self.inner.context;
        let condition = context.upstream.query();

        let published = if context.config.disallow_force_update {
            let key = context.upstream.map_key();
            let present = {
                let mut mapped = self
                    .inner
                    .mapped
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner);
                let present = mapped.contains_key(&key);
                if !present {
                    mapped.insert(key.clone(), model.clone());
                }
                present
            };
            if present {
                self.inner.backend.remove_old_cache(&condition).await?;
            }
            self.mapped(&key)
        } else {
            self.inner.backend.remove_old_cache(&condition).await?;
            Some(model.clone())
        };

        self.inner.backend.add_new_cache(model).await?;
        if let Some(memory) = &self.inner.memory {
            memory.remove_old_cache(&condition).await?;
            memory.add_new_cache(model).await?;
        }
        tracing::debug!(repository = %context.config.label(), "Cached network result");
        Ok(published)
    }

    async fn fail(&self, error: &NetworkError) {
        let context = &self.inner.context;
        tracing::debug!(repository = %context.config.label(), %error, "Upstream failed");
        context.upstream.on_failure(error);

        if context.config.clear_on_network_error {
            self.inner.sink.reset();
            if context.params_valid("clear") {
                if let Err(err) = self.remove_current().await {
                    tracing::warn!(
                        repository = %context.config.label(),
                        error = %err,
                        "Failed to clear cache after upstream failure"
                    );
                }
            }
        }
        context.emit(LoadEvent::network_failure());
    }

    async fn remove_current(&self) -> cache::Result<()> {
        let condition = self.inner.context.upstream.query();
        self.inner.backend.remove_old_cache(&condition).await?;
        if let Some(memory) = &self.inner.memory {
            memory.remove_old_cache(&condition).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl<M: Model, K: SinkKind> DataSource for SingleFetcher<M, K> {
    async fn load_from_cache(&self, kind: BackendKind) -> fetch::Result<bool> {
        let inner = &self.inner;
        if !inner.context.upstream.check_params() {
            return Err(inner.context.invalid_query());
        }
        let condition = inner.context.upstream.query();

        let cached = match &inner.memory {
            Some(memory) if kind == BackendKind::Memory => memory.query_cache(&condition).await?,
            _ if kind == inner.backend.kind() => {
                let cached = inner.backend.query_cache(&condition).await?;
                if let (Some(model), Some(memory)) = (&cached, &inner.memory) {
                    memory.add_new_cache(model).await?;
                }
                cached
            }
            _ => {
                tracing::trace!(%kind, "No backend for cache tier");
                inner.sink.reset();
                return Ok(false);
            }
        };

        match cached {
            Some(mut model) => {
                inner.context.upstream.intercept(Provenance::Cache, &mut model);
                self.publish(model);
                inner.context.emit(LoadEvent::cache_success());
                Ok(true)
            }
            None => {
                inner.context.emit(LoadEvent::cache_failure());
                Ok(false)
            }
        }
    }

    async fn load_from_network(&self) -> fetch::Result<()> {
        if !self.inner.context.upstream.check_params() {
            return Err(self.inner.context.invalid_query());
        }
        let handle = Handle::try_current().map_err(|err| FetchError::Dispatch(err.to_string()))?;
        let fetcher = self.clone();
        handle.spawn(fetcher.run_network());
        tracing::trace!(repository = %self.inner.context.config.label(), "Network request dispatched");
        Ok(())
    }
}
