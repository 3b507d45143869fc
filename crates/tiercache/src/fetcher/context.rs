use std::any::Any;
use std::fmt;
use std::sync::Arc;

use tiercache_core::fetch::{FetchError, LoadEvent, LoadListener, Upstream};
use tiercache_core::relay::{Publisher, RelayRegistry};
use tiercache_core::storage::Connectivity;
use tiercache_core::PayloadType;

use crate::repository::{Model, PageCursor, RepositoryConfig};

/// A repository's registration with a [`RelayRegistry`].
///
/// Registers a fresh publisher on creation and unsubscribes it on drop.
pub struct RelayLink {
    registry: RelayRegistry,
    publisher: Arc<Publisher>,
    key: PayloadType,
}

impl RelayLink {
    pub(crate) fn register(registry: RelayRegistry, key: PayloadType) -> Self {
        let publisher = registry.register(key);
        tracing::debug!(%key, publisher = publisher.id(), "Repository joined relay");
        Self {
            registry,
            publisher,
            key,
        }
    }

    pub fn publisher(&self) -> &Arc<Publisher> {
        &self.publisher
    }

    /// Unsubscribes the publisher. Returns false if it already left.
    pub(crate) fn leave(&self) -> bool {
        self.registry.unregister(self.key, &self.publisher)
    }

    pub(crate) fn send<V>(&self, value: V)
    where
        V: Any + Send + Sync,
    {
        self.publisher.send(self.key, value);
    }

    pub(crate) fn last_value<V>(&self) -> Option<V>
    where
        V: Any + Clone,
    {
        self.publisher.last_value(self.key)
    }
}

impl Drop for RelayLink {
    fn drop(&mut self) {
        let removed = self.leave();
        tracing::debug!(key = %self.key, publisher = self.publisher.id(), removed, "Repository left relay");
    }
}

impl fmt::Debug for RelayLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelayLink")
            .field("key", &self.key)
            .field("publisher", &self.publisher.id())
            .finish()
    }
}

/// Collaborators shared by both fetcher variants.
pub(crate) struct FetchContext<M: Model> {
    pub(crate) upstream: Arc<dyn Upstream<M>>,
    pub(crate) config: RepositoryConfig,
    pub(crate) connectivity: Arc<dyn Connectivity>,
    pub(crate) listener: Option<Arc<dyn LoadListener>>,
    pub(crate) relay: Option<Arc<RelayLink>>,
    pub(crate) page: PageCursor,
}

impl<M: Model> FetchContext<M> {
    pub(crate) fn emit(&self, event: LoadEvent) {
        tracing::trace!(repository = %self.config.label(), %event, "Load event");
        if let Some(listener) = &self.listener {
            listener.on_load(event);
        }
    }

    pub(crate) fn relay<V>(&self, value: V)
    where
        V: Any + Send + Sync,
    {
        if let Some(relay) = &self.relay {
            relay.send(value);
        }
    }

    pub(crate) fn log_models(&self, models: &[M]) {
        if !self.config.log_print {
            return;
        }
        for model in models {
            tracing::debug!(repository = %self.config.label(), ?model, "Published model");
        }
    }

    /// Whether the upstream accepts the current request parameters, logging
    /// when it does not.
    pub(crate) fn params_valid(&self, operation: &'static str) -> bool {
        let valid = self.upstream.check_params();
        if !valid {
            tracing::warn!(
                repository = %self.config.label(),
                operation,
                "Request parameters rejected, skipping cache update"
            );
        }
        valid
    }

    pub(crate) fn invalid_query(&self) -> FetchError {
        FetchError::InvalidQuery(format!(
            "{} rejected its request parameters",
            self.config.label()
        ))
    }
}
