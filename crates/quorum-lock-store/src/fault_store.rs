//! A [`LockStore`] wrapper that can be taken down or slowed down.
//!
//! `FaultyStore` wraps any `Arc<dyn LockStore>`. While marked unavailable every call
//! fails with [`StoreError::Connection`]; a configured latency is slept before each
//! call, which lets per-node timeouts fire deterministically in tests.
//!
//! # Example
//!
//! ```ignore
//! let node = FaultyStore::new("redis://localhost:6380/0", Arc::new(MemoryStore::new()));
//! node.set_latency(Duration::from_millis(300)); // slower than the node timeout
//! node.set_available(false);                    // connection refused from now on
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use crate::error::StoreError;
use crate::traits::LockStore;

/// A [`LockStore`] wrapper with switchable availability and injected latency.
pub struct FaultyStore {
    label: String,
    inner: Arc<dyn LockStore>,
    available: AtomicBool,
    latency_ms: AtomicU64,
}

impl FaultyStore {
    /// Wrap an existing store, initially available with no added latency.
    pub fn new(label: impl Into<String>, inner: Arc<dyn LockStore>) -> Self {
        Self {
            label: label.into(),
            inner,
            available: AtomicBool::new(true),
            latency_ms: AtomicU64::new(0),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Mark the node reachable or unreachable.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    /// Sleep this long before each call.
    pub fn set_latency(&self, latency: Duration) {
        let ms = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX);
        self.latency_ms.store(ms, Ordering::SeqCst);
    }

    async fn before_call(&self) -> Result<(), StoreError> {
        let ms = self.latency_ms.load(Ordering::SeqCst);
        if ms > 0 {
            tokio::time::sleep(Duration::from_millis(ms)).await;
        }

        if !self.is_available() {
            return Err(StoreError::Connection(format!(
                "node {} is unreachable",
                self.label
            )));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl LockStore for FaultyStore {
    async fn set_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<bool, StoreError> {
        self.before_call().await?;
        self.inner.set_if_absent(key, value, ttl).await
    }

    async fn delete_if_equals(&self, key: &str, value: &str) -> Result<bool, StoreError> {
        self.before_call().await?;
        self.inner.delete_if_equals(key, value).await
    }

    async fn extend_if_equals(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<bool, StoreError> {
        self.before_call().await?;
        self.inner.extend_if_equals(key, value, ttl).await
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.before_call().await?;
        self.inner.get(key).await
    }
}
