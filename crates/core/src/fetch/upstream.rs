use async_trait::async_trait;
use futures_util::stream::{self, BoxStream, StreamExt};

use crate::condition::Condition;
use crate::strategy::Provenance;

use super::NetworkError;

/// Result of one upstream delivery.
pub type NetworkResult<T> = std::result::Result<T, NetworkError>;

/// The caller-supplied upstream for a repository's model `M`.
///
/// Every hook has a default so implementors only provide what their data
/// source supports. One-shot loaders (`load`, `load_list`) take priority over
/// the streaming ones; when a one-shot loader returns `None` the matching
/// stream is consumed instead.
#[async_trait]
pub trait Upstream<M: Send + 'static>: Send + Sync + 'static {
    /// One-shot load of a single value.
    async fn load(&self) -> Option<NetworkResult<M>> {
        None
    }

    /// Streaming load of single values.
    fn load_stream(&self) -> BoxStream<'static, NetworkResult<M>> {
        stream::empty().boxed()
    }

    /// One-shot load of a collection.
    async fn load_list(&self) -> Option<NetworkResult<Vec<M>>> {
        None
    }

    /// Streaming load of collections.
    fn load_list_stream(&self) -> BoxStream<'static, NetworkResult<Vec<M>>> {
        stream::empty().boxed()
    }

    /// Condition identifying the records this request concerns.
    fn query(&self) -> Condition {
        Condition::all()
    }

    /// Validates request parameters before the network phase starts.
    fn check_params(&self) -> bool {
        true
    }

    /// Total number of records across every page, when the upstream
    /// reports one.
    fn total_size(&self) -> Option<usize> {
        None
    }

    /// Bucket key for keyed list accumulation.
    fn map_key(&self) -> String {
        chrono::Utc::now().timestamp_millis().to_string()
    }

    /// Last chance to rewrite a value before it is cached or published.
    fn intercept(&self, _provenance: Provenance, _model: &mut M) {}

    fn intercept_list(&self, _provenance: Provenance, _models: &mut Vec<M>) {}

    /// Called for every upstream failure.
    fn on_failure(&self, _error: &NetworkError) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Silent;

    #[async_trait]
    impl Upstream<u32> for Silent {}

    #[tokio::test]
    async fn test_defaults() {
        let upstream = Silent;
        assert!(upstream.load().await.is_none());
        assert!(upstream.load_list().await.is_none());
        assert_eq!(upstream.load_stream().count().await, 0);
        assert_eq!(upstream.load_list_stream().count().await, 0);
        assert_eq!(upstream.query(), Condition::all());
        assert!(upstream.check_params());
        assert_eq!(upstream.total_size(), None);
        assert!(upstream.map_key().parse::<i64>().is_ok());
    }

    #[test]
    fn test_intercept_default_leaves_value() {
        let mut value = 7;
        Silent.intercept(Provenance::Network, &mut value);
        assert_eq!(value, 7);
    }
}
