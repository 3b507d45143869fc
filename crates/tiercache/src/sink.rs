//! Concrete sinks: a one-shot last-value holder and a replaying stream.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};

use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use tiercache_core::sink::{Sink, SinkKind, SinkValue};

/// Last-value holder for one-shot consumers.
#[derive(Debug)]
pub struct LatestValue<T> {
    value: RwLock<T>,
    version: AtomicU64,
}

impl<T: SinkValue> LatestValue<T> {
    pub fn get(&self) -> T {
        self.current()
    }

    /// Number of values published so far, resets included.
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }
}

impl<T: SinkValue> Sink<T> for LatestValue<T> {
    fn empty() -> Self {
        Self {
            value: RwLock::new(T::default()),
            version: AtomicU64::new(0),
        }
    }

    fn publish(&self, value: T) {
        *self.value.write().unwrap_or_else(PoisonError::into_inner) = value;
        self.version.fetch_add(1, Ordering::AcqRel);
    }

    fn current(&self) -> T {
        self.value
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Hot, multi-subscriber slot. New subscribers see the latest value first.
#[derive(Debug)]
pub struct StreamSlot<T> {
    sender: watch::Sender<T>,
}

impl<T: SinkValue> StreamSlot<T> {
    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.sender.subscribe()
    }

    /// Stream of values starting with the current one.
    pub fn stream(&self) -> WatchStream<T> {
        WatchStream::new(self.sender.subscribe())
    }

    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl<T: SinkValue> Sink<T> for StreamSlot<T> {
    fn empty() -> Self {
        Self {
            sender: watch::Sender::new(T::default()),
        }
    }

    fn publish(&self, value: T) {
        self.sender.send_replace(value);
    }

    fn current(&self) -> T {
        self.sender.borrow().clone()
    }
}

/// Repositories publishing into [`LatestValue`] slots.
#[derive(Debug, Clone, Copy, Default)]
pub struct OneShot;

impl SinkKind for OneShot {
    type Slot<T: SinkValue> = LatestValue<T>;
}

/// Repositories publishing into [`StreamSlot`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct Streaming;

impl SinkKind for Streaming {
    type Slot<T: SinkValue> = StreamSlot<T>;
}
