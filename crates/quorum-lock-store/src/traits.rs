//! Core traits for lock stores.

use std::sync::Arc;
use std::time::Duration;

use crate::error::StoreError;
use crate::node::NodeDescriptor;

/// One lock node.
///
/// All mutating operations are atomic on the node; callers never need a
/// read-then-write sequence. Implementations must be `Send + Sync` for use
/// across async tasks. Timeouts are enforced by [`crate::StoreNode`], so
/// implementations may block for as long as the backend does.
#[async_trait::async_trait]
pub trait LockStore: Send + Sync {
    /// Store `value` under `key` with the given expiry, only if no live value is present.
    ///
    /// Returns `true` iff this call wrote the value.
    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration)
    -> Result<bool, StoreError>;

    /// Delete `key` only if its live value equals `value`.
    ///
    /// Returns `true` iff this call deleted the value.
    async fn delete_if_equals(&self, key: &str, value: &str) -> Result<bool, StoreError>;

    /// Reset the expiry of `key` to `ttl` only if its live value equals `value`.
    ///
    /// Returns `true` iff the expiry was reset.
    async fn extend_if_equals(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<bool, StoreError>;

    /// Current live value of `key`, if any.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
}

/// Factory turning resolved node descriptors into store handles.
///
/// Called once per node when a lock is built; the returned handle is owned by
/// that lock.
pub trait StoreConnector: Send + Sync {
    fn connect(&self, node: &NodeDescriptor) -> Result<Arc<dyn LockStore>, StoreError>;
}
