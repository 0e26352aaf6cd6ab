//! Quorum lock engine
//!
//! One [`QuorumLock`] drives a single named lock across N independent nodes. An
//! acquisition attempt writes a fresh token to every node with set-if-absent and counts
//! the nodes that accepted it. The attempt wins only when a strict majority accepted it
//! and the drift-adjusted validity window is still positive; otherwise every node is
//! cleared of the token before the next attempt. Individual node failures count as
//! refusals and never abort an attempt.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use quorum_lock_common::{LockOptions, NodeConfig};
use quorum_lock_store::{NodeDescriptor, RedisConnector, StoreConnector, StoreError, StoreNode};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::metrics;
use crate::retry::RetryPolicy;
use crate::token::LockToken;
use crate::validity::{quorum_size, validity};

/// Outcome of an acquisition or extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AcquireResult {
    /// Whether a quorum holds this lock's token
    pub acquired: bool,
    /// Time the holder may rely on exclusivity; zero when not acquired
    pub validity: Duration,
    /// Attempts made
    pub attempts: u32,
}

impl AcquireResult {
    fn held(validity: Duration, attempts: u32) -> Self {
        Self {
            acquired: true,
            validity,
            attempts,
        }
    }

    fn failed(attempts: u32) -> Self {
        Self {
            acquired: false,
            validity: Duration::ZERO,
            attempts,
        }
    }
}

/// A distributed lock held by agreement of a majority of nodes
pub struct QuorumLock {
    resource: String,
    nodes: Vec<StoreNode>,
    ttl: Duration,
    drift_factor: f64,
    retry: RetryPolicy,
    token: Option<LockToken>,
}

impl QuorumLock {
    pub fn builder(resource: impl Into<String>) -> QuorumLockBuilder {
        QuorumLockBuilder::new(resource)
    }

    /// Build a lock against Redis nodes described by `options`
    pub fn new(resource: impl Into<String>, options: LockOptions) -> Result<Self> {
        Self::builder(resource).options(options).build()
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Nodes that must agree for the lock to be held
    pub fn quorum(&self) -> usize {
        quorum_size(self.nodes.len())
    }

    /// Whether this instance currently owns a token (it may have expired on the nodes)
    pub fn is_held(&self) -> bool {
        self.token.is_some()
    }

    /// Try to acquire the lock, retrying on contention
    pub async fn acquire(&mut self) -> bool {
        self.acquire_with_validity().await.acquired
    }

    /// Try to acquire the lock and report the remaining validity window
    pub async fn acquire_with_validity(&mut self) -> AcquireResult {
        self.acquire_inner(None).await
    }

    /// Like [`Self::acquire_with_validity`], but gives up as soon as `cancel` fires.
    ///
    /// In-flight node calls and retry pauses are abandoned; any partially placed token is
    /// cleared before returning a failed result.
    pub async fn acquire_until_cancelled(&mut self, cancel: &CancellationToken) -> AcquireResult {
        self.acquire_inner(Some(cancel)).await
    }

    async fn acquire_inner(&mut self, cancel: Option<&CancellationToken>) -> AcquireResult {
        let started = Instant::now();
        let attempts = self.retry.attempts();

        if self.token.is_some() {
            warn!(
                resource = %self.resource,
                "Acquiring while a previous token is held; it will only expire by TTL"
            );
        }

        for attempt in 1..=attempts {
            let token = LockToken::generate();
            self.token = Some(token.clone());

            let outcome = tokio::select! {
                biased;
                _ = cancelled(cancel) => None,
                window = self.attempt(&token) => Some(window),
            };

            match outcome {
                Some(Some(window)) => {
                    info!(
                        resource = %self.resource,
                        attempt,
                        validity_ms = window.as_millis() as u64,
                        "Lock acquired"
                    );
                    metrics::record_acquire("acquired", attempt, started.elapsed());
                    return AcquireResult::held(window, attempt);
                }
                Some(None) => self.release().await,
                None => {
                    self.release().await;
                    debug!(resource = %self.resource, attempt, "Lock acquisition cancelled");
                    metrics::record_acquire("cancelled", attempt, started.elapsed());
                    return AcquireResult::failed(attempt);
                }
            }

            if attempt < attempts {
                let delay = self.retry.jittered_delay();
                debug!(
                    resource = %self.resource,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "Lock contended, retrying"
                );
                let interrupted = tokio::select! {
                    biased;
                    _ = cancelled(cancel) => true,
                    _ = tokio::time::sleep(delay) => false,
                };
                if interrupted {
                    metrics::record_acquire("cancelled", attempt, started.elapsed());
                    return AcquireResult::failed(attempt);
                }
            }
        }

        debug!(resource = %self.resource, attempts, "Lock not acquired");
        metrics::record_acquire("contended", attempts, started.elapsed());
        AcquireResult::failed(attempts)
    }

    /// One placement of `token` on every node; the validity window if a quorum accepted it
    async fn attempt(&self, token: &LockToken) -> Option<Duration> {
        let started = Instant::now();
        let votes = join_all(self.nodes.iter().map(|node| async move {
            match node
                .set_if_absent(&self.resource, token.as_str(), self.ttl)
                .await
            {
                Ok(accepted) => accepted,
                Err(err) => {
                    node_failure(node, "acquire", &err);
                    false
                }
            }
        }))
        .await;

        let accepted = votes.into_iter().filter(|accepted| *accepted).count();
        let window = validity(self.ttl, started.elapsed(), self.drift_factor);
        debug!(
            resource = %self.resource,
            accepted,
            quorum = self.quorum(),
            validity = ?window,
            "Lock attempt finished"
        );

        window.filter(|_| accepted >= self.quorum())
    }

    /// Delete this instance's token from every node that still stores it.
    ///
    /// Best-effort and idempotent: node failures are logged and ignored (the value
    /// expires there by TTL), and releasing without a token does nothing.
    pub async fn release(&mut self) {
        let Some(token) = self.token.take() else {
            return;
        };

        let resource = self.resource.as_str();
        let deleted = join_all(self.nodes.iter().map(|node| {
            let token = &token;
            async move {
                match node.delete_if_equals(resource, token.as_str()).await {
                    Ok(deleted) => deleted,
                    Err(err) => {
                        node_failure(node, "release", &err);
                        false
                    }
                }
            }
        }))
        .await
        .into_iter()
        .filter(|deleted| *deleted)
        .count();

        debug!(resource = %self.resource, deleted, "Lock released");
        metrics::record_release();
    }

    /// Reset the lease to the full TTL on every node still holding this instance's token.
    ///
    /// Succeeds under the same quorum and validity rules as acquisition. A failed
    /// extension keeps the token so the lock can still be released.
    pub async fn extend(&self) -> AcquireResult {
        let Some(token) = self.token.as_ref() else {
            return AcquireResult::failed(0);
        };

        let started = Instant::now();
        let extended = join_all(self.nodes.iter().map(|node| async move {
            match node
                .extend_if_equals(&self.resource, token.as_str(), self.ttl)
                .await
            {
                Ok(extended) => extended,
                Err(err) => {
                    node_failure(node, "extend", &err);
                    false
                }
            }
        }))
        .await
        .into_iter()
        .filter(|extended| *extended)
        .count();

        let window = validity(self.ttl, started.elapsed(), self.drift_factor)
            .filter(|_| extended >= self.quorum());
        metrics::record_extend(window.is_some());

        match window {
            Some(window) => {
                debug!(resource = %self.resource, extended, "Lock extended");
                AcquireResult::held(window, 1)
            }
            None => {
                warn!(
                    resource = %self.resource,
                    extended,
                    quorum = self.quorum(),
                    "Lock extension failed"
                );
                AcquireResult::failed(1)
            }
        }
    }

    /// Whether a quorum of nodes currently stores any value for the resource.
    ///
    /// Ownership is not checked, so every instance contending for the resource sees the
    /// same answer. Meant for observability, not for correctness decisions.
    pub async fn locked(&self) -> bool {
        let present = join_all(self.nodes.iter().map(|node| async move {
            match node.get(&self.resource).await {
                Ok(value) => value.is_some(),
                Err(err) => {
                    node_failure(node, "probe", &err);
                    false
                }
            }
        }))
        .await
        .into_iter()
        .filter(|present| *present)
        .count();

        present >= self.quorum()
    }
}

impl std::fmt::Debug for QuorumLock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuorumLock")
            .field("resource", &self.resource)
            .field("nodes", &self.nodes)
            .field("ttl", &self.ttl)
            .field("retry", &self.retry)
            .field("held", &self.token.is_some())
            .finish()
    }
}

fn node_failure(node: &StoreNode, operation: &'static str, err: &StoreError) {
    warn!(node = %node.label(), operation, error = %err, "Lock node call failed");
    metrics::record_node_failure(node.label(), operation);
}

async fn cancelled(cancel: Option<&CancellationToken>) {
    match cancel {
        Some(token) => token.cancelled().await,
        None => std::future::pending().await,
    }
}

/// Builder for [`QuorumLock`]
pub struct QuorumLockBuilder {
    resource: String,
    options: LockOptions,
    connector: Option<Arc<dyn StoreConnector>>,
}

impl QuorumLockBuilder {
    pub fn new(resource: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            options: LockOptions::default(),
            connector: None,
        }
    }

    /// Replace all options at once
    pub fn options(mut self, options: LockOptions) -> Self {
        self.options = options;
        self
    }

    pub fn nodes(mut self, nodes: Vec<NodeConfig>) -> Self {
        self.options.nodes = nodes;
        self
    }

    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.options.ttl_ms = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn retry_count(mut self, retry_count: u32) -> Self {
        self.options.retry_count = retry_count;
        self
    }

    pub fn retry_delay(mut self, retry_delay: Duration) -> Self {
        self.options.retry_delay_ms = u64::try_from(retry_delay.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn drift_factor(mut self, drift_factor: f64) -> Self {
        self.options.drift_factor = drift_factor;
        self
    }

    /// Store factory used for every node (Redis when not set)
    pub fn connector<C: StoreConnector + 'static>(mut self, connector: C) -> Self {
        self.connector = Some(Arc::new(connector));
        self
    }

    pub fn build(self) -> Result<QuorumLock> {
        self.options.validate()?;

        let connector = self
            .connector
            .unwrap_or_else(|| Arc::new(RedisConnector));
        let nodes = NodeDescriptor::resolve_all(&self.options.nodes)?
            .into_iter()
            .map(|descriptor| {
                let store = connector.connect(&descriptor)?;
                Ok(StoreNode::new(descriptor, store))
            })
            .collect::<std::result::Result<Vec<_>, StoreError>>()?;
        let retry = RetryPolicy::new(self.options.retry_count, self.options.retry_delay());

        debug!(
            resource = %self.resource,
            nodes = nodes.len(),
            ttl_ms = self.options.ttl_ms,
            attempts = retry.attempts(),
            max_retry_delay = ?retry.max_delay(),
            "Quorum lock built"
        );

        Ok(QuorumLock {
            resource: self.resource,
            nodes,
            ttl: self.options.ttl(),
            drift_factor: self.options.drift_factor,
            retry,
            token: None,
        })
    }
}
