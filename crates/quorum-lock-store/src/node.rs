//! Node descriptors and the timeout-bounded node handle.
//!
//! Heterogeneous [`NodeConfig`] entries (URL or host/port/db) are resolved once into a
//! uniform [`NodeDescriptor`] carrying a normalized connection URL, a printable label
//! and the per-call timeout. [`StoreNode`] pairs a descriptor with its store handle and
//! bounds every call by that timeout.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use quorum_lock_common::{DEFAULT_PORT, NodeConfig};
use url::Url;

use crate::error::StoreError;
use crate::traits::LockStore;

/// A resolved lock node
#[derive(Clone, PartialEq, Eq)]
pub struct NodeDescriptor {
    url: Url,
    label: String,
    socket_timeout: Duration,
}

impl NodeDescriptor {
    /// Resolve a node configuration into a descriptor
    pub fn resolve(config: &NodeConfig) -> Result<Self, StoreError> {
        let url = match config {
            NodeConfig::Url { url, .. } => Url::parse(url)
                .map_err(|e| StoreError::InvalidNode(format!("{}: {}", url, e)))?,
            NodeConfig::Address {
                host,
                port,
                db,
                password,
                ..
            } => {
                let raw = format!("redis://{}:{}/{}", host, port, db);
                let mut url =
                    Url::parse(&raw).map_err(|e| StoreError::InvalidNode(format!("{}: {}", raw, e)))?;
                if let Some(password) = password
                    && url.set_password(Some(password)).is_err()
                {
                    return Err(StoreError::InvalidNode(format!(
                        "{}: cannot carry a password",
                        raw
                    )));
                }
                url
            }
        };

        let url = normalize(url)?;
        let mut printable = url.clone();
        let _ = printable.set_password(None);
        let _ = printable.set_username("");

        Ok(Self {
            url,
            label: printable.to_string(),
            socket_timeout: config.socket_timeout(),
        })
    }

    /// Resolve a list of node configurations, failing on the first invalid entry
    pub fn resolve_all(configs: &[NodeConfig]) -> Result<Vec<Self>, StoreError> {
        configs.iter().map(Self::resolve).collect()
    }

    /// Connection URL, including credentials
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Connection URL without credentials, used for logs and node identity
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn socket_timeout(&self) -> Duration {
        self.socket_timeout
    }
}

impl fmt::Debug for NodeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeDescriptor")
            .field("label", &self.label)
            .field("socket_timeout", &self.socket_timeout)
            .finish()
    }
}

fn normalize(mut url: Url) -> Result<Url, StoreError> {
    match url.scheme() {
        "redis" | "rediss" => {
            if url.host_str().is_none_or(str::is_empty) {
                return Err(StoreError::InvalidNode(format!("{}: missing host", url)));
            }
            if url.port().is_none() {
                let _ = url.set_port(Some(DEFAULT_PORT));
            }
            let db = url.path().trim_matches('/').to_string();
            if db.is_empty() {
                url.set_path("/0");
            } else if db.parse::<i64>().is_err() {
                return Err(StoreError::InvalidNode(format!(
                    "{}: database '{}' is not a number",
                    url, db
                )));
            }
            Ok(url)
        }
        "unix" | "redis+unix" => Ok(url),
        other => Err(StoreError::InvalidNode(format!(
            "{}: unsupported scheme '{}'",
            url, other
        ))),
    }
}

/// A node handle whose calls are bounded by the node's timeout
#[derive(Clone)]
pub struct StoreNode {
    descriptor: NodeDescriptor,
    store: Arc<dyn LockStore>,
}

impl StoreNode {
    pub fn new(descriptor: NodeDescriptor, store: Arc<dyn LockStore>) -> Self {
        Self { descriptor, store }
    }

    pub fn descriptor(&self) -> &NodeDescriptor {
        &self.descriptor
    }

    pub fn label(&self) -> &str {
        self.descriptor.label()
    }

    pub async fn set_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<bool, StoreError> {
        self.bounded(self.store.set_if_absent(key, value, ttl))
            .await
    }

    pub async fn delete_if_equals(&self, key: &str, value: &str) -> Result<bool, StoreError> {
        self.bounded(self.store.delete_if_equals(key, value)).await
    }

    pub async fn extend_if_equals(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<bool, StoreError> {
        self.bounded(self.store.extend_if_equals(key, value, ttl))
            .await
    }

    pub async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.bounded(self.store.get(key)).await
    }

    async fn bounded<T>(
        &self,
        call: impl Future<Output = Result<T, StoreError>>,
    ) -> Result<T, StoreError> {
        let timeout = self.descriptor.socket_timeout;
        match tokio::time::timeout(timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(StoreError::Timeout {
                node: self.descriptor.label.clone(),
                timeout,
            }),
        }
    }
}

impl fmt::Debug for StoreNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreNode")
            .field("descriptor", &self.descriptor)
            .finish_non_exhaustive()
    }
}
