//! Fetch-side contracts: errors, load notifications and the upstream hook set.

mod error;
mod event;
mod upstream;

pub use error::{FetchError, NetworkError, Result};
pub use event::{LoadEvent, LoadListener, LoadSource, LoadState};
pub use upstream::{NetworkResult, Upstream};

/// Notified whenever values are added to a repository's cache.
pub trait SyncListener<M>: Send + Sync {
    /// `single` is true when exactly one value was added.
    fn on_sync(&self, single: bool, data: &[M]);
}
