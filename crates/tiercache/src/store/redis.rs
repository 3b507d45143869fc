//! Redis object store.

use std::time::Duration;

use async_trait::async_trait;
use redis::AsyncCommands;

use tiercache_core::storage::{ObjectStore, Result, StoreError};

/// Maps Redis errors to StoreError.
fn map_redis_error(err: redis::RedisError) -> StoreError {
    if err.is_connection_refusal() || err.is_timeout() || err.is_connection_dropped() {
        StoreError::ConnectionFailed(err.to_string())
    } else {
        StoreError::QueryFailed(err.to_string())
    }
}

/// Object store on a Redis server, using a connection manager for reconnects.
///
/// Keys are namespaced with an optional prefix so several repositories can
/// share one database.
#[derive(Clone)]
pub struct RedisObjectStore {
    conn: redis::aio::ConnectionManager,
    prefix: String,
    ttl: Option<Duration>,
}

impl RedisObjectStore {
    /// Connects to `url` (e.g. "redis://localhost:6379").
    pub async fn new(url: &str) -> Result<Self> {
        let client = redis::Client::open(url).map_err(map_redis_error)?;
        let conn = redis::aio::ConnectionManager::new(client)
            .await
            .map_err(map_redis_error)?;
        Ok(Self {
            conn,
            prefix: String::new(),
            ttl: None,
        })
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Expires every value `ttl` after it was written. Sub-second values round
    /// up to one second.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    fn key(&self, key: &str) -> String {
        format!("{}{key}", self.prefix)
    }
}

#[async_trait]
impl ObjectStore for RedisObjectStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let mut conn = self.conn.clone();
        let result: Option<Vec<u8>> = conn.get(self.key(key)).await.map_err(map_redis_error)?;
        Ok(result)
    }

    async fn put(&self, key: &str, value: &[u8]) -> Result<()> {
        let mut conn = self.conn.clone();
        let key = self.key(key);
        match self.ttl {
            Some(duration) => {
                let seconds = duration.as_secs().max(1);
                conn.set_ex::<_, _, ()>(key, value, seconds)
                    .await
                    .map_err(map_redis_error)?;
            }
            None => {
                conn.set::<_, _, ()>(key, value)
                    .await
                    .map_err(map_redis_error)?;
            }
        }
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        conn.del::<_, ()>(self.key(key))
            .await
            .map_err(map_redis_error)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_error_maps_to_query_failed() {
        let err = redis::RedisError::from((redis::ErrorKind::TypeError, "wrong type"));
        assert!(matches!(map_redis_error(err), StoreError::QueryFailed(_)));
    }

    #[test]
    fn test_io_error_maps_to_connection_failed() {
        let err = redis::RedisError::from(std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            "refused",
        ));
        assert!(matches!(map_redis_error(err), StoreError::ConnectionFailed(_)));
    }
}
