use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use crate::payload::PayloadType;

use super::{Publisher, Subscriber};

/// Holds one [`Subscriber`] per payload type plus the well-known default
/// [`Publisher`], which is registered with every subscriber it creates.
///
/// Cloning yields a handle to the same registry.
#[derive(Clone)]
pub struct RelayRegistry {
    inner: Arc<RegistryInner>,
}

struct RegistryInner {
    default: Arc<Publisher>,
    subscribers: Mutex<HashMap<PayloadType, Arc<Subscriber>>>,
}

impl RelayRegistry {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                default: Publisher::new(),
                subscribers: Mutex::new(HashMap::new()),
            }),
        }
    }

    pub fn default_publisher(&self) -> Arc<Publisher> {
        Arc::clone(&self.inner.default)
    }

    /// The subscriber for `key`, created on first use.
    pub fn subscriber(&self, key: PayloadType) -> Arc<Subscriber> {
        let mut subscribers = self
            .inner
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let subscriber = subscribers
            .entry(key)
            .or_insert_with(|| Subscriber::new(key, Arc::clone(&self.inner.default)));
        Arc::clone(subscriber)
    }

    /// Creates a publisher and subscribes it to `key`.
    pub fn register(&self, key: PayloadType) -> Arc<Publisher> {
        let publisher = Publisher::new();
        self.subscriber(key).subscribe(&publisher);
        publisher
    }

    /// Unsubscribes `publisher` from `key` if that subscriber still exists.
    pub fn unregister(&self, key: PayloadType, publisher: &Arc<Publisher>) -> bool {
        let subscriber = self
            .inner
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
            .cloned();
        subscriber.is_some_and(|subscriber| subscriber.unsubscribe(publisher))
    }

    /// Drops the subscriber for `key`. Publishers keep their values but no
    /// longer relay.
    pub fn destroy(&self, key: PayloadType) -> bool {
        let removed = self
            .inner
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&key);
        if removed.is_some() {
            self.inner.default.detach(key);
            tracing::debug!(%key, "Relay subscriber destroyed");
        }
        removed.is_some()
    }

    pub fn clear(&self) {
        let drained: Vec<PayloadType> = self
            .inner
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain()
            .map(|(key, _)| key)
            .collect();
        for key in &drained {
            self.inner.default.detach(*key);
        }
        tracing::debug!(count = drained.len(), "Relay registry cleared");
    }

    pub fn contains(&self, key: PayloadType) -> bool {
        self.inner
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&key)
    }

    pub fn len(&self) -> usize {
        self.inner
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for RelayRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RelayRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelayRegistry")
            .field("default", &self.inner.default)
            .field("subscribers", &self.len())
            .finish()
    }
}
