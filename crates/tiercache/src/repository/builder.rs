use std::any::type_name;
use std::marker::PhantomData;
use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};

use tiercache_core::cache::CacheBackend;
use tiercache_core::fetch::{LoadListener, Upstream};
use tiercache_core::relay::RelayRegistry;
use tiercache_core::sink::SinkKind;
use tiercache_core::storage::{ConditionedStore, Connectivity, ObjectStore};
use tiercache_core::strategy::Strategy;
use tiercache_core::{PayloadMode, PayloadType};

use crate::backend::{
    DatabaseBackend, EmptyBackend, KeyProvider, KvBackend, ListBackend, ListDatabaseBackend,
    MemoryBackend, MemoryStore,
};
use crate::config::Config;
use crate::fetcher::{FetchContext, ListFetcher, RelayLink, SingleFetcher};
use crate::sink::OneShot;
use crate::store::SwitchConnectivity;

use super::error::{ConfigError, Result};
use super::{Fetcher, Model, PageCursor, Repository, RepositoryConfig};

/// Declarative configuration of a [`Repository`].
///
/// ```ignore
/// let repository = Repository::<Article>::builder()
///     .strategy(Strategy::DatabaseCache)
///     .payload_type(PayloadType::of::<Article>())
///     .upstream(ArticleFeed::new(client))
///     .database(store)
///     .build()
///     .await?;
/// ```
pub struct RepositoryBuilder<M: Model, K: SinkKind = OneShot> {
    strategy: Option<Strategy>,
    list_mode: bool,
    log_print: Option<bool>,
    payload_type: Option<PayloadType>,
    clear_on_network_error: bool,
    disallow_force_update: bool,
    page_append: bool,
    description: String,
    registry: Option<RelayRegistry>,
    upstream: Option<Arc<dyn Upstream<M>>>,
    single_backend: Option<Arc<dyn CacheBackend<M>>>,
    list_backend: Option<Arc<dyn CacheBackend<Vec<M>>>>,
    memory_store: Option<MemoryStore>,
    memory_name: Option<String>,
    connectivity: Option<Arc<dyn Connectivity>>,
    listener: Option<Arc<dyn LoadListener>>,
    page: Option<PageCursor>,
    _kind: PhantomData<fn() -> K>,
}

impl<M: Model, K: SinkKind> Default for RepositoryBuilder<M, K> {
    fn default() -> Self {
        Self {
            strategy: None,
            list_mode: true,
            log_print: None,
            payload_type: None,
            clear_on_network_error: false,
            disallow_force_update: false,
            page_append: false,
            description: String::new(),
            registry: None,
            upstream: None,
            single_backend: None,
            list_backend: None,
            memory_store: None,
            memory_name: None,
            connectivity: None,
            listener: None,
            page: None,
            _kind: PhantomData,
        }
    }
}

impl<M: Model, K: SinkKind> RepositoryBuilder<M, K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = Some(strategy);
        self
    }

    /// List repositories (the default) serve `Vec<M>`; otherwise a single `M`.
    pub fn list_mode(mut self, list_mode: bool) -> Self {
        self.list_mode = list_mode;
        self
    }

    /// Overrides `TIERCACHE_LOG_PRINT` for this repository.
    pub fn log_print(mut self, log_print: bool) -> Self {
        self.log_print = Some(log_print);
        self
    }

    /// Declares the model type. Must be `PayloadType::of::<M>()`.
    pub fn payload_type(mut self, payload_type: PayloadType) -> Self {
        self.payload_type = Some(payload_type);
        self
    }

    pub fn clear_on_network_error(mut self, clear: bool) -> Self {
        self.clear_on_network_error = clear;
        self
    }

    pub fn disallow_force_update(mut self, disallow: bool) -> Self {
        self.disallow_force_update = disallow;
        self
    }

    pub fn page_append(mut self, page_append: bool) -> Self {
        self.page_append = page_append;
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Relays every published value through `registry`.
    pub fn notify(mut self, registry: RelayRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn upstream(mut self, upstream: impl Upstream<M>) -> Self {
        self.upstream = Some(Arc::new(upstream));
        self
    }

    pub fn shared_upstream(mut self, upstream: Arc<dyn Upstream<M>>) -> Self {
        self.upstream = Some(upstream);
        self
    }

    /// Caches into a conditioned store, in both single and list mode.
    pub fn database(mut self, store: Arc<dyn ConditionedStore<M>>) -> Self {
        self.single_backend = Some(Arc::new(DatabaseBackend::new(Arc::clone(&store))));
        self.list_backend = Some(Arc::new(ListDatabaseBackend::new(store)));
        self
    }

    pub fn custom_backend(mut self, backend: Arc<dyn CacheBackend<M>>) -> Self {
        self.single_backend = Some(backend);
        self
    }

    pub fn custom_list_backend(mut self, backend: Arc<dyn CacheBackend<Vec<M>>>) -> Self {
        self.list_backend = Some(backend);
        self
    }

    /// Memory tier used by [`Strategy::MemoryCache`]. Defaults to
    /// [`MemoryStore::global`].
    pub fn memory_store(mut self, store: MemoryStore) -> Self {
        self.memory_store = Some(store);
        self
    }

    /// Name of the memory-tier slot. Defaults to the payload type name.
    pub fn memory_name(mut self, name: impl Into<String>) -> Self {
        self.memory_name = Some(name.into());
        self
    }

    /// Defaults to an always-online [`SwitchConnectivity`].
    pub fn connectivity(mut self, connectivity: Arc<dyn Connectivity>) -> Self {
        self.connectivity = Some(connectivity);
        self
    }

    pub fn listener(mut self, listener: Arc<dyn LoadListener>) -> Self {
        self.listener = Some(listener);
        self
    }

    /// Shares a page cursor with the upstream.
    pub fn page_cursor(mut self, cursor: PageCursor) -> Self {
        self.page = Some(cursor);
        self
    }

    fn validate(&self) -> Result<RepositoryConfig> {
        let strategy = self.strategy.ok_or(ConfigError::MissingStrategy)?;
        let payload_type = self.payload_type.ok_or(ConfigError::MissingPayloadType)?;
        if !payload_type.is::<M>() {
            return Err(ConfigError::PayloadTypeMismatch {
                declared: payload_type.name(),
                actual: type_name::<M>(),
            });
        }
        if self.upstream.is_none() {
            return Err(ConfigError::MissingUpstream);
        }
        if self.page_append && !self.list_mode {
            return Err(ConfigError::PageAppendRequiresList);
        }

        let backend_missing = if self.list_mode {
            self.list_backend.is_none()
        } else {
            self.single_backend.is_none()
        };
        if strategy.uses_cache() && backend_missing {
            return Err(ConfigError::MissingBackend { strategy });
        }

        Ok(RepositoryConfig {
            strategy,
            mode: if self.list_mode {
                PayloadMode::List
            } else {
                PayloadMode::Single
            },
            payload_type,
            log_print: self
                .log_print
                .unwrap_or_else(|| Config::from_env().log_print),
            clear_on_network_error: self.clear_on_network_error,
            disallow_force_update: self.disallow_force_update,
            page_append: self.page_append,
            description: self.description.clone(),
            notify: self.registry.is_some(),
        })
    }

    /// Validates the configuration, builds the backend and fetcher for the
    /// configured mode, and initializes the backend.
    pub async fn build(self) -> Result<Repository<M, K>> {
        let config = self.validate()?;
        let Self {
            registry,
            upstream,
            single_backend,
            list_backend,
            memory_store,
            memory_name,
            connectivity,
            listener,
            page,
            ..
        } = self;

        let upstream = upstream.ok_or(ConfigError::MissingUpstream)?;
        let page = page.unwrap_or_default();
        let relay = registry.map(|registry| Arc::new(RelayLink::register(registry, config.payload_type)));
        let context = FetchContext {
            upstream,
            config: config.clone(),
            connectivity: connectivity
                .unwrap_or_else(|| Arc::new(SwitchConnectivity::online())),
            listener,
            relay: relay.clone(),
            page: page.clone(),
        };

        let uses_memory = config.strategy == Strategy::MemoryCache;
        let memory_store = memory_store.unwrap_or_else(MemoryStore::global);

        let fetcher = match config.mode {
            PayloadMode::Single => {
                let backend: Arc<dyn CacheBackend<M>> = match single_backend {
                    Some(backend) if config.strategy.uses_cache() => backend,
                    _ => Arc::new(EmptyBackend::<M>::new()),
                };
                backend.init().await?;

                let memory = if uses_memory {
                    let name = memory_name.unwrap_or_else(|| config.payload_type.name().to_string());
                    let memory = MemoryBackend::<M>::single(memory_store, name);
                    memory.init().await?;
                    Some(memory)
                } else {
                    None
                };
                Fetcher::Single(SingleFetcher::new(context, backend, memory))
            }
            PayloadMode::List => {
                let backend: Arc<dyn CacheBackend<Vec<M>>> = match list_backend {
                    Some(backend) if config.strategy.uses_cache() => backend,
                    _ => Arc::new(EmptyBackend::<Vec<M>>::new()),
                };
                backend.init().await?;

                let memory = if uses_memory {
                    let name = memory_name
                        .unwrap_or_else(|| format!("{}[]", config.payload_type.name()));
                    let memory = MemoryBackend::<Vec<M>>::list(memory_store, name);
                    memory.init().await?;
                    Some(memory)
                } else {
                    None
                };
                Fetcher::List(ListFetcher::new(context, ListBackend::new(backend), memory))
            }
        };

        tracing::debug!(
            repository = %config.label(),
            strategy = %config.strategy,
            mode = %config.mode,
            notify = config.notify,
            "Repository built"
        );

        Ok(Repository {
            config,
            fetcher,
            page,
            relay,
        })
    }
}

impl<M, K> RepositoryBuilder<M, K>
where
    M: Model + Serialize + DeserializeOwned,
    K: SinkKind,
{
    /// Caches into an object store under the key `key` returns.
    pub fn kv<F>(mut self, store: Arc<dyn ObjectStore>, key: F) -> Self
    where
        F: Fn() -> String + Send + Sync + 'static,
    {
        let key: KeyProvider = Arc::new(key);
        self.single_backend = Some(Arc::new(KvBackend::<M>::single(
            Arc::clone(&store),
            Arc::clone(&key),
        )));
        self.list_backend = Some(Arc::new(KvBackend::<Vec<M>>::list(store, key)));
        self
    }
}
