use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock, Weak};

use crate::payload::PayloadType;

use super::Subscriber;

static NEXT_PUBLISHER_ID: AtomicU64 = AtomicU64::new(1);

pub(crate) type SharedValue = Arc<dyn Any + Send + Sync>;

/// Owns one last-value slot per payload type and forwards its own sends to
/// the subscriber of that type.
pub struct Publisher {
    id: u64,
    slots: RwLock<HashMap<PayloadType, SharedValue>>,
    subscribers: Mutex<HashMap<PayloadType, Weak<Subscriber>>>,
}

impl Publisher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            id: NEXT_PUBLISHER_ID.fetch_add(1, Ordering::Relaxed),
            slots: RwLock::new(HashMap::new()),
            subscribers: Mutex::new(HashMap::new()),
        })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Stores `value` in this publisher's slot for `key`, then relays it to
    /// every other publisher subscribed to `key`.
    pub fn send<V>(&self, key: PayloadType, value: V)
    where
        V: Any + Send + Sync,
    {
        let value: SharedValue = Arc::new(value);
        self.store(key, Arc::clone(&value));

        let subscriber = self
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
            .and_then(Weak::upgrade);

        match subscriber {
            Some(subscriber) => subscriber.relay(self, value),
            None => tracing::trace!(publisher = self.id, %key, "No subscriber for payload type"),
        }
    }

    /// Last value held for `key`, if one was stored with type `V`.
    pub fn last_value<V>(&self, key: PayloadType) -> Option<V>
    where
        V: Any + Clone,
    {
        self.slots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
            .and_then(|value| value.downcast_ref::<V>())
            .cloned()
    }

    pub fn has_value(&self, key: PayloadType) -> bool {
        self.slots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&key)
    }

    pub(crate) fn store(&self, key: PayloadType, value: SharedValue) {
        self.slots
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, value);
    }

    pub(crate) fn reset(&self, key: PayloadType) {
        self.slots
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&key);
    }

    pub(crate) fn attach(&self, key: PayloadType, subscriber: Weak<Subscriber>) {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, subscriber);
    }

    pub(crate) fn detach(&self, key: PayloadType) {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&key);
    }
}

impl fmt::Debug for Publisher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Publisher").field("id", &self.id).finish()
    }
}
