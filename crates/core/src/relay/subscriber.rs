use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use crate::payload::PayloadType;

use super::publisher::SharedValue;
use super::Publisher;

/// Ordered, identity-deduplicated set of publishers sharing one payload type.
pub struct Subscriber {
    key: PayloadType,
    default: Arc<Publisher>,
    publishers: Mutex<Vec<Arc<Publisher>>>,
}

impl Subscriber {
    /// Creates the subscriber for `key` with `default` already registered.
    pub(crate) fn new(key: PayloadType, default: Arc<Publisher>) -> Arc<Self> {
        let subscriber = Arc::new(Self {
            key,
            default: Arc::clone(&default),
            publishers: Mutex::new(Vec::new()),
        });
        subscriber.subscribe(&default);
        subscriber
    }

    pub fn key(&self) -> PayloadType {
        self.key
    }

    /// Registers `publisher`. Subscribing the same publisher twice has no effect.
    pub fn subscribe(self: &Arc<Self>, publisher: &Arc<Publisher>) {
        let mut publishers = self
            .publishers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if publishers.iter().any(|p| Arc::ptr_eq(p, publisher)) {
            return;
        }
        publishers.push(Arc::clone(publisher));
        publisher.attach(self.key, Arc::downgrade(self));
        tracing::trace!(key = %self.key, publisher = publisher.id(), "Publisher subscribed");
    }

    /// Removes `publisher` and clears its slot for this payload type.
    ///
    /// Returns false for the default publisher, which stays registered.
    pub fn unsubscribe(&self, publisher: &Arc<Publisher>) -> bool {
        if Arc::ptr_eq(publisher, &self.default) {
            return false;
        }
        let mut publishers = self
            .publishers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let before = publishers.len();
        publishers.retain(|p| !Arc::ptr_eq(p, publisher));
        let removed = publishers.len() != before;
        if removed {
            publisher.reset(self.key);
            publisher.detach(self.key);
        }
        removed
    }

    pub fn is_subscribed(&self, publisher: &Arc<Publisher>) -> bool {
        self.publishers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .any(|p| Arc::ptr_eq(p, publisher))
    }

    pub fn len(&self) -> usize {
        self.publishers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copies `value` into every registered publisher except `sender`. The
    /// default publisher always receives.
    pub(crate) fn relay(&self, sender: &Publisher, value: SharedValue) {
        let publishers = self
            .publishers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        for publisher in publishers.iter() {
            let is_sender = publisher.id() == sender.id();
            let is_default = Arc::ptr_eq(publisher, &self.default);
            if !is_sender || is_default {
                publisher.store(self.key, Arc::clone(&value));
            }
        }
        tracing::trace!(key = %self.key, sender = sender.id(), receivers = publishers.len(), "Relayed value");
    }
}

impl fmt::Debug for Subscriber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscriber")
            .field("key", &self.key)
            .field("publishers", &self.len())
            .finish()
    }
}
