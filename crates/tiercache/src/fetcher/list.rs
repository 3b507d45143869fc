use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use futures_util::StreamExt;
use tokio::runtime::Handle;

use tiercache_core::cache::{self, BackendKind, CacheBackend};
use tiercache_core::condition::Condition;
use tiercache_core::fetch::{
    self, FetchError, LoadEvent, NetworkError, NetworkResult, SyncListener,
};
use tiercache_core::sink::{Sink, SinkKind};
use tiercache_core::strategy::{select_data, DataSource, Provenance};

use crate::backend::{ListBackend, MemoryBackend};
use crate::repository::Model;

use super::FetchContext;

/// Resolves a collection into a `K::Slot<Vec<M>>`.
pub struct ListFetcher<M: Model, K: SinkKind> {
    inner: Arc<Inner<M, K>>,
}

struct Inner<M: Model, K: SinkKind> {
    context: FetchContext<M>,
    backend: ListBackend<M>,
    memory: Option<MemoryBackend<Vec<M>>>,
    sink: K::Slot<Vec<M>>,
    mapped: Mutex<HashMap<String, Vec<M>>>,
    /// Pages making up the sink value, in arrival order.
    pages: Mutex<Vec<(Condition, Vec<M>)>>,
}

impl<M: Model, K: SinkKind> Clone for ListFetcher<M, K> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<M: Model, K: SinkKind> fmt::Debug for ListFetcher<M, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListFetcher")
            .field("repository", &self.inner.context.config.label())
            .field("backend", &self.inner.backend)
            .field("memory", &self.inner.memory.is_some())
            .finish()
    }
}

impl<M: Model, K: SinkKind> ListFetcher<M, K> {
    pub(crate) fn new(
        context: FetchContext<M>,
        backend: ListBackend<M>,
        memory: Option<MemoryBackend<Vec<M>>>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                context,
                backend,
                memory,
                sink: <K::Slot<Vec<M>> as Sink<Vec<M>>>::empty(),
                mapped: Mutex::new(HashMap::new()),
                pages: Mutex::new(Vec::new()),
            }),
        }
    }

    pub(crate) fn sink(&self) -> &K::Slot<Vec<M>> {
        &self.inner.sink
    }

    pub(crate) fn backend(&self) -> &ListBackend<M> {
        &self.inner.backend
    }

    pub(crate) fn query(&self) -> Condition {
        self.inner.context.upstream.query()
    }

    pub(crate) fn mapped(&self, key: &str) -> Option<Vec<M>> {
        self.inner
            .mapped
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    pub(crate) async fn fetch(&self) -> fetch::Result<&K::Slot<Vec<M>>> {
        let context = &self.inner.context;
        let selection = select_data(
            context.config.strategy,
            self.inner.backend.kind(),
            context.connectivity.as_ref(),
            self,
        )
        .await?;

        if !selection.loaded {
            self.reset_sink();
            context.emit(LoadEvent::other_failure());
        }
        Ok(&self.inner.sink)
    }

    pub(crate) fn clear(&self) {
        self.reset_sink();
    }

    pub(crate) fn emit(&self, event: LoadEvent) {
        self.inner.context.emit(event);
    }

    /// Drops the accumulated pages so the next page starts a new list.
    pub(crate) fn forget_pages(&self) {
        self.pages().clear();
    }

    fn reset_sink(&self) {
        self.inner.sink.reset();
        self.forget_pages();
    }

    fn pages(&self) -> MutexGuard<'_, Vec<(Condition, Vec<M>)>> {
        self.inner.pages.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Makes `models` the only page of the sink value.
    fn track_only(&self, condition: &Condition, models: &[M]) {
        *self.pages() = vec![(condition.clone(), models.to_vec())];
    }

    /// Puts `page` in place of the page fetched for `condition`, or after the
    /// last one, and returns the concatenation of every page.
    fn merge_page(&self, condition: &Condition, page: &[M]) -> Vec<M> {
        let mut pages = self.pages();
        match pages.iter_mut().find(|(tracked, _)| tracked == condition) {
            Some((_, models)) => *models = page.to_vec(),
            None => pages.push((condition.clone(), page.to_vec())),
        }
        pages.iter().flat_map(|(_, models)| models.iter().cloned()).collect()
    }

    /// Appends `models` to the cache and the sink without touching the
    /// network, then hands them to `sync`.
    pub(crate) async fn add_all(
        &self,
        models: Vec<M>,
        sync: Option<&dyn SyncListener<M>>,
    ) -> fetch::Result<()> {
        if models.is_empty() {
            return Ok(());
        }
        let inner = &self.inner;
        let condition = inner.context.upstream.query();

        if inner.backend.kind() == BackendKind::Database {
            inner.backend.add_new_cache(&models).await?;
        } else {
            let mut stored = inner
                .backend
                .query_cache(&condition)
                .await?
                .unwrap_or_default();
            stored.extend(models.iter().cloned());
            inner.backend.remove_old_cache(&condition).await?;
            inner.backend.add_new_cache(&stored).await?;
        }

        let mut current = inner.sink.current();
        current.extend(models.iter().cloned());
        {
            let mut pages = self.pages();
            match pages.iter_mut().find(|(tracked, _)| *tracked == condition) {
                Some((_, page)) => page.extend(models.iter().cloned()),
                None => pages.push((condition.clone(), models.clone())),
            }
        }
        self.refresh_memory(&condition, &current).await?;
        self.publish(current);

        tracing::debug!(
            repository = %inner.context.config.label(),
            added = models.len(),
            "Added models without network"
        );
        if let Some(sync) = sync {
            sync.on_sync(models.len() == 1, &models);
        }
        Ok(())
    }

    fn publish(&self, models: Vec<M>) {
        let context = &self.inner.context;
        context.log_models(&models);
        self.inner.sink.publish(models.clone());
        context.relay(models);
    }

    async fn refresh_memory(&self, condition: &Condition, models: &Vec<M>) -> cache::Result<()> {
        if let Some(memory) = &self.inner.memory {
            memory.remove_old_cache(condition).await?;
            memory.add_new_cache(models).await?;
        }
        Ok(())
    }

    async fn run_network(self) {
        let upstream = Arc::clone(&self.inner.context.upstream);
        match upstream.load_list().await {
            Some(result) => self.complete(result).await,
            None => {
                let mut results = upstream.load_list_stream();
                while let Some(result) = results.next().await {
                    self.complete(result).await;
                }
            }
        }
    }

    async fn complete(&self, result: NetworkResult<Vec<M>>) {
        match result {
            Ok(models) => self.parse(models).await,
            Err(err) => self.fail(&err).await,
        }
    }

    async fn parse(&self, mut models: Vec<M>) {
        let context = &self.inner.context;
        context
            .upstream
            .intercept_list(Provenance::Network, &mut models);

        if !context.params_valid("parse") {
            context.emit(LoadEvent::network_failure());
            return;
        }
        if let Some(total) = context.upstream.total_size() {
            context.page.set_total_size(total);
        }

        let stored = if context.config.page_append {
            self.append(models).await
        } else {
            self.replace(models).await
        };

        match stored {
            Ok(published) => {
                self.publish(published);
                context.emit(LoadEvent::network_success());
            }
            Err(err) => {
                tracing::warn!(
                    repository = %context.config.label(),
                    error = %err,
                    "Failed to cache network result"
                );
                context.emit(LoadEvent::network_failure());
            }
        }
    }

    /// Stores `models` under the map key unless it is already taken, in
    /// which case the current condition is cleared instead.
    async fn map_or_clear(&self, condition: &Condition, models: &[M]) -> cache::Result<String> {
        let key = self.inner.context.upstream.map_key();
        let present = {
            let mut mapped = self
                .inner
                .mapped
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            let present = mapped.contains_key(&key);
            if !present {
                mapped.insert(key.clone(), models.to_vec());
            }
            present
        };
        if present {
            self.inner.backend.remove_old_cache(condition).await?;
        }
        Ok(key)
    }

    async fn replace(&self, models: Vec<M>) -> cache::Result<Vec<M>> {
        let inner = &self.inner;
        let condition = inner.context.upstream.query();

        let key = if inner.context.config.disallow_force_update {
            Some(self.map_or_clear(&condition, &models).await?)
        } else {
            inner.backend.remove_old_cache(&condition).await?;
            None
        };

        inner.backend.add_new_cache(&models).await?;
        self.refresh_memory(&condition, &models).await?;
        self.track_only(&condition, &models);
        tracing::debug!(repository = %inner.context.config.label(), count = models.len(), "Replaced cached list");

        Ok(match key {
            Some(key) => self.mapped(&key).unwrap_or_default(),
            None => models,
        })
    }

    async fn append(&self, page: Vec<M>) -> cache::Result<Vec<M>> {
        let inner = &self.inner;
        let condition = inner.context.upstream.query();

        let key = if inner.context.config.disallow_force_update {
            Some(self.map_or_clear(&condition, &page).await?)
        } else {
            inner.backend.invalidate_all(&condition).await?;
            None
        };

        inner.backend.add_new_cache(&page).await?;
        inner.backend.ledger().record(condition.clone());
        let merged = self.merge_page(&condition, &page);
        self.refresh_memory(&condition, &merged).await?;
        tracing::debug!(
            repository = %inner.context.config.label(),
            page = page.len(),
            count = merged.len(),
            ledgered = inner.backend.ledger().len(),
            "Appended page"
        );

        Ok(match key {
            Some(key) => self.mapped(&key).unwrap_or_default(),
            None => merged,
        })
    }

    async fn fail(&self, error: &NetworkError) {
        let context = &self.inner.context;
        tracing::debug!(repository = %context.config.label(), %error, "Upstream failed");
        context.upstream.on_failure(error);

        if context.config.clear_on_network_error {
            self.reset_sink();
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
impl<M: Model, K: SinkKind> DataSource for ListFetcher<M, K> {
    async fn load_from_cache(&self, kind: BackendKind) -> fetch::Result<bool> {
        let inner = &self.inner;
        if !inner.context.upstream.check_params() {
            return Err(inner.context.invalid_query());
        }
        let condition = inner.context.upstream.query();

        // A windowed query counts every row, so the count is the collection size.
        if inner.context.config.page_append
            && condition.window.is_some()
            && kind == inner.backend.kind()
        {
            let total = inner.backend.query_cache_size(&condition).await?;
            let page = &inner.context.page;
            page.set_total_size(usize::try_from(total).unwrap_or(0));
            if page.is_out_of_range() {
                tracing::trace!(
                    repository = %inner.context.config.label(),
                    page = page.page_no(),
                    total,
                    "Page outside cached range"
                );
                inner.context.emit(LoadEvent::cache_failure());
                return Ok(false);
            }
        }

        let cached = match &inner.memory {
            Some(memory) if kind == BackendKind::Memory => memory.query_cache(&condition).await?,
            _ if kind == inner.backend.kind() => {
                let cached = inner.backend.query_cache(&condition).await?;
                if let (Some(models), Some(memory)) = (&cached, &inner.memory) {
                    if !models.is_empty() {
                        memory.add_new_cache(models).await?;
                    }
                }
                cached
            }
            _ => {
                tracing::trace!(%kind, "No backend for cache tier");
                self.reset_sink();
                inner.context.relay(Vec::<M>::new());
                return Ok(false);
            }
        };

        match cached {
            Some(mut models) if !models.is_empty() => {
                inner
                    .context
                    .upstream
                    .intercept_list(Provenance::Cache, &mut models);
                self.track_only(&condition, &models);
                self.publish(models);
                inner.context.emit(LoadEvent::cache_success());
                Ok(true)
            }
            _ => {
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
