//! Scoped acquisition with guaranteed release

use std::future::Future;
use std::panic::{AssertUnwindSafe, resume_unwind};
use std::time::Duration;

use futures::FutureExt;
use tracing::debug;

use crate::engine::QuorumLock;
use crate::error::{LockError, Result};

impl QuorumLock {
    /// Run `body` while holding the lock.
    ///
    /// The body receives the validity window of the acquisition. When the lock cannot be
    /// acquired the body never runs and [`LockError::Acquisition`] is returned. Once the
    /// body has started, the lock is released exactly once however it finishes, including
    /// by panic, which is resumed after the release.
    ///
    /// A body dropped mid-flight (for example by an enclosing timeout) skips the release;
    /// the lock then lapses by TTL.
    pub async fn with_lock<F, Fut, T>(&mut self, body: F) -> Result<T>
    where
        F: FnOnce(Duration) -> Fut,
        Fut: Future<Output = T>,
    {
        let acquired = self.acquire_with_validity().await;
        if !acquired.acquired {
            return Err(LockError::Acquisition {
                resource: self.resource().to_string(),
                attempts: acquired.attempts,
            });
        }

        let outcome = AssertUnwindSafe(body(acquired.validity))
            .catch_unwind()
            .await;
        self.release().await;

        match outcome {
            Ok(value) => Ok(value),
            Err(panic) => {
                debug!(resource = %self.resource(), "Lock released after panic in scope");
                resume_unwind(panic)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    use quorum_lock_common::{CLOCK_DRIFT_FACTOR, NodeConfig};
    use quorum_lock_store::InMemoryCluster;

    use super::*;

    const TTL: Duration = Duration::from_millis(1000);

    fn lock_on(cluster: &InMemoryCluster) -> QuorumLock {
        QuorumLock::builder("scoped")
            .nodes(vec![NodeConfig::default()])
            .ttl(TTL)
            .retry_count(2)
            .retry_delay(Duration::from_millis(5))
            .connector(cluster.clone())
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_scope_sees_bounded_validity() {
        let cluster = InMemoryCluster::new();
        let mut lock = lock_on(&cluster);

        let validity = lock.with_lock(|validity| async move { validity }).await.unwrap();
        assert!(validity > Duration::ZERO);
        assert!(validity < TTL - TTL.mul_f64(CLOCK_DRIFT_FACTOR));
        assert!(!lock.is_held());
    }

    #[tokio::test]
    async fn test_contended_scope_is_not_entered() {
        let cluster = InMemoryCluster::new();
        let mut holder = lock_on(&cluster);
        let mut contender = lock_on(&cluster);

        let entered = AtomicBool::new(false);
        let flag = &entered;
        let contender = &mut contender;
        let err = holder
            .with_lock(|_| async move {
                contender
                    .with_lock(|_| async move { flag.store(true, Ordering::SeqCst) })
                    .await
            })
            .await
            .unwrap()
            .unwrap_err();

        assert!(err.is_acquisition());
        assert!(matches!(err, LockError::Acquisition { attempts: 2, .. }));
        assert!(!entered.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_released_after_scope() {
        let cluster = InMemoryCluster::new();
        let mut first = lock_on(&cluster);
        let mut second = lock_on(&cluster);

        first.with_lock(|_| async {}).await.unwrap();
        assert!(second.acquire().await);
        second.release().await;
    }

    #[tokio::test]
    async fn test_released_when_body_fails() {
        let cluster = InMemoryCluster::new();
        let mut lock = lock_on(&cluster);

        let result: std::result::Result<(), &str> = lock
            .with_lock(|_| async { Err("body failed") })
            .await
            .unwrap();
        assert_eq!(result, Err("body failed"));
        assert!(!lock.locked().await);
    }

    #[tokio::test]
    async fn test_released_when_body_panics() {
        let cluster = InMemoryCluster::new();
        let lock = Arc::new(tokio::sync::Mutex::new(lock_on(&cluster)));

        let scoped = lock.clone();
        let joined = tokio::spawn(async move {
            let mut lock = scoped.lock().await;
            lock.with_lock(|_| async { panic!("boom") }).await
        })
        .await;
        assert!(joined.unwrap_err().is_panic());

        let mut other = lock_on(&cluster);
        assert!(other.acquire().await);
        other.release().await;
    }
}
