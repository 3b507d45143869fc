use async_trait::async_trait;

use crate::cache::BackendKind;
use crate::fetch::Result;

/// The two load primitives a strategy composes.
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Reads the given cache tier and publishes what it finds.
    ///
    /// Returns true when the tier produced a non-empty value.
    async fn load_from_cache(&self, kind: BackendKind) -> Result<bool>;

    /// Starts the network phase. Delivery happens asynchronously; returning
    /// `Ok` only means the request was dispatched.
    async fn load_from_network(&self) -> Result<()>;
}
