//! Redis-backed lock store.
//!
//! | primitive          | Redis command                                   |
//! |--------------------|-------------------------------------------------|
//! | `set_if_absent`    | `SET key value NX PX ttl`                       |
//! | `delete_if_equals` | Lua: `GET` then `DEL` if the value matches      |
//! | `extend_if_equals` | Lua: `GET` then `PEXPIRE` if the value matches  |
//! | `get`              | `GET key`                                       |
//!
//! The compare-and-act primitives run as scripts so they stay atomic on the server.
//! A multiplexed connection is opened on first use and dropped after an I/O failure,
//! so the next call reconnects.

use std::future::Future;
use std::sync::{Arc, LazyLock};
use std::time::Duration;

use redis::aio::MultiplexedConnection;
use redis::{Client, RedisError, RedisResult, Script};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::StoreError;
use crate::node::NodeDescriptor;
use crate::traits::{LockStore, StoreConnector};

static DELETE_IF_EQUALS: LazyLock<Script> = LazyLock::new(|| {
    Script::new(
        r#"
if redis.call("get", KEYS[1]) == ARGV[1] then
    return redis.call("del", KEYS[1])
else
    return 0
end
"#,
    )
});

static EXTEND_IF_EQUALS: LazyLock<Script> = LazyLock::new(|| {
    Script::new(
        r#"
if redis.call("get", KEYS[1]) == ARGV[1] then
    return redis.call("pexpire", KEYS[1], ARGV[2])
else
    return 0
end
"#,
    )
});

/// One Redis node
pub struct RedisStore {
    label: String,
    client: Client,
    connection: Mutex<Option<MultiplexedConnection>>,
}

impl RedisStore {
    /// Create a store for the node. No connection is made until the first call.
    pub fn open(node: &NodeDescriptor) -> Result<Self, StoreError> {
        let client = Client::open(node.url().as_str())
            .map_err(|e| StoreError::InvalidNode(format!("{}: {}", node.label(), e)))?;
        Ok(Self {
            label: node.label().to_string(),
            client,
            connection: Mutex::new(None),
        })
    }

    async fn connection(&self) -> Result<MultiplexedConnection, StoreError> {
        let mut guard = self.connection.lock().await;
        if let Some(connection) = guard.as_ref() {
            return Ok(connection.clone());
        }

        let connection = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| self.store_error(e))?;
        debug!(node = %self.label, "Connected to lock node");
        *guard = Some(connection.clone());
        Ok(connection)
    }

    async fn run<T, F, Fut>(&self, command: F) -> Result<T, StoreError>
    where
        F: FnOnce(MultiplexedConnection) -> Fut,
        Fut: Future<Output = RedisResult<T>>,
    {
        let connection = self.connection().await?;
        match command(connection).await {
            Ok(reply) => Ok(reply),
            Err(err) => {
                if err.is_io_error() || err.is_connection_dropped() {
                    warn!(node = %self.label, error = %err, "Dropping broken lock node connection");
                    self.connection.lock().await.take();
                }
                Err(self.store_error(err))
            }
        }
    }

    fn store_error(&self, err: RedisError) -> StoreError {
        if err.is_io_error()
            || err.is_connection_refusal()
            || err.is_connection_dropped()
            || err.is_timeout()
        {
            StoreError::Connection(format!("{}: {}", self.label, err))
        } else {
            StoreError::Protocol(format!("{}: {}", self.label, err))
        }
    }
}

fn ttl_millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1)
}

#[async_trait::async_trait]
impl LockStore for RedisStore {
    async fn set_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<bool, StoreError> {
        let ttl_ms = ttl_millis(ttl);
        let reply: Option<String> = self
            .run(|mut connection| async move {
                redis::cmd("SET")
                    .arg(key)
                    .arg(value)
                    .arg("NX")
                    .arg("PX")
                    .arg(ttl_ms)
                    .query_async(&mut connection)
                    .await
            })
            .await?;
        Ok(reply.is_some())
    }

    async fn delete_if_equals(&self, key: &str, value: &str) -> Result<bool, StoreError> {
        let deleted: i64 = self
            .run(|mut connection| async move {
                DELETE_IF_EQUALS
                    .key(key)
                    .arg(value)
                    .invoke_async(&mut connection)
                    .await
            })
            .await?;
        Ok(deleted == 1)
    }

    async fn extend_if_equals(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<bool, StoreError> {
        let ttl_ms = ttl_millis(ttl);
        let extended: i64 = self
            .run(|mut connection| async move {
                EXTEND_IF_EQUALS
                    .key(key)
                    .arg(value)
                    .arg(ttl_ms)
                    .invoke_async(&mut connection)
                    .await
            })
            .await?;
        Ok(extended == 1)
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.run(|mut connection| async move {
            redis::cmd("GET").arg(key).query_async(&mut connection).await
        })
        .await
    }
}

/// Connector opening one [`RedisStore`] per node
#[derive(Debug, Clone, Copy, Default)]
pub struct RedisConnector;

impl StoreConnector for RedisConnector {
    fn connect(&self, node: &NodeDescriptor) -> Result<Arc<dyn LockStore>, StoreError> {
        Ok(Arc::new(RedisStore::open(node)?))
    }
}

#[cfg(test)]
mod tests {
    use quorum_lock_common::NodeConfig;

    use super::*;

    #[test]
    fn test_ttl_millis_is_never_zero() {
        assert_eq!(ttl_millis(Duration::ZERO), 1);
        assert_eq!(ttl_millis(Duration::from_micros(500)), 1);
        assert_eq!(ttl_millis(Duration::from_secs(2)), 2000);
    }

    #[test]
    fn test_open_does_not_connect() {
        // Nothing listens on this port; opening must still succeed.
        let node = NodeDescriptor::resolve(&NodeConfig::address("127.0.0.1", 1)).unwrap();
        assert!(RedisStore::open(&node).is_ok());
        assert!(RedisConnector.connect(&node).is_ok());
    }

    #[tokio::test]
    async fn test_unreachable_node_is_a_connection_error() {
        let node = NodeDescriptor::resolve(&NodeConfig::address("127.0.0.1", 1)).unwrap();
        let store = RedisStore::open(&node).unwrap();

        let err = store.get("res").await.unwrap_err();
        assert!(matches!(err, StoreError::Connection(_)), "{:?}", err);
    }

    #[tokio::test]
    #[ignore]
    async fn test_redis_primitives() {
        // Requires a Redis server on localhost:6379
        let node = NodeDescriptor::resolve(&NodeConfig::default()).unwrap();
        let store = RedisStore::open(&node).unwrap();
        let key = "quorum-lock:test_redis_primitives";
        store.delete_if_equals(key, "a").await.unwrap();

        assert!(store.set_if_absent(key, "a", Duration::from_secs(5)).await.unwrap());
        assert!(!store.set_if_absent(key, "b", Duration::from_secs(5)).await.unwrap());
        assert_eq!(store.get(key).await.unwrap().as_deref(), Some("a"));
        assert!(store.extend_if_equals(key, "a", Duration::from_secs(10)).await.unwrap());
        assert!(!store.extend_if_equals(key, "b", Duration::from_secs(10)).await.unwrap());
        assert!(!store.delete_if_equals(key, "b").await.unwrap());
        assert!(store.delete_if_equals(key, "a").await.unwrap());
        assert_eq!(store.get(key).await.unwrap(), None);
    }
}
