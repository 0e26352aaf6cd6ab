//! Call-depth reentrancy on top of an exclusive lock
//!
//! [`ReentrantLock`] lets nested scopes of one logical owner acquire the same lock
//! repeatedly. Only the outermost acquire and the matching outermost release reach the
//! wrapped lock. Ownership is not tracked per task: sharing one wrapper between
//! independent owners defeats the lock.

use async_trait::async_trait;
use tracing::{debug, trace};

use crate::engine::QuorumLock;

/// The acquire/release pair the reentrant wrapper delegates to
#[async_trait]
pub trait ExclusiveLock: Send {
    async fn acquire(&mut self) -> bool;

    async fn release(&mut self);
}

#[async_trait]
impl ExclusiveLock for QuorumLock {
    async fn acquire(&mut self) -> bool {
        QuorumLock::acquire(self).await
    }

    async fn release(&mut self) {
        QuorumLock::release(self).await
    }
}

/// Depth-counting wrapper around an [`ExclusiveLock`]
#[derive(Debug)]
pub struct ReentrantLock<L: ExclusiveLock = QuorumLock> {
    inner: L,
    depth: usize,
    acquired: bool,
}

impl<L: ExclusiveLock> ReentrantLock<L> {
    pub fn new(inner: L) -> Self {
        Self {
            inner,
            depth: 0,
            acquired: false,
        }
    }

    /// Current nesting depth
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn inner(&self) -> &L {
        &self.inner
    }

    pub fn into_inner(self) -> L {
        self.inner
    }

    /// Acquire the lock, or join an acquisition already in progress.
    ///
    /// The wrapped lock is only asked on the outermost call; nested calls return that
    /// call's result. The depth grows on every call, whatever the result.
    pub async fn acquire(&mut self) -> bool {
        if self.depth == 0 {
            self.acquired = self.inner.acquire().await;
            debug!(acquired = self.acquired, "Reentrant lock entered");
        } else {
            trace!(depth = self.depth, "Reentrant lock nested");
        }
        self.depth += 1;
        self.acquired
    }

    /// Leave one level; the wrapped lock is released when the outermost level is left.
    ///
    /// Releasing more often than acquiring does nothing.
    pub async fn release(&mut self) {
        match self.depth {
            0 => trace!("Reentrant lock released while not held"),
            1 => {
                self.depth = 0;
                self.acquired = false;
                self.inner.release().await;
                debug!("Reentrant lock left");
            }
            _ => self.depth -= 1,
        }
    }
}
