//! Quorum Lock Core - Distributed mutual exclusion across independent nodes
//!
//! This crate provides:
//! - `QuorumLock`: Redlock-style lock acquired by a majority of nodes, with a
//!   clock-drift-aware validity window, jittered retries, extension and cancellation
//! - `ReentrantLock`: call-depth counting wrapper for nested scopes of one owner
//! - `QuorumLock::with_lock`: scoped acquisition that always releases
//! - Lock metrics recorded through the `metrics` facade
//!
//! # Example
//!
//! ```ignore
//! let mut lock = QuorumLock::builder("orders:42")
//!     .nodes(vec![
//!         NodeConfig::url("redis://10.0.0.1:6379/0"),
//!         NodeConfig::url("redis://10.0.0.2:6379/0"),
//!         NodeConfig::url("redis://10.0.0.3:6379/0"),
//!     ])
//!     .ttl(Duration::from_secs(5))
//!     .build()?;
//!
//! lock.with_lock(|validity| async move {
//!     // exclusive for at most `validity`
//! })
//! .await?;
//! ```

pub mod engine;
pub mod error;
pub mod metrics;
pub mod reentrant;
pub mod retry;
pub mod scoped;
pub mod token;
pub mod validity;

pub use engine::{AcquireResult, QuorumLock, QuorumLockBuilder};
pub use error::{LockError, Result};
pub use reentrant::{ExclusiveLock, ReentrantLock};
pub use retry::RetryPolicy;
pub use token::LockToken;
pub use validity::{clock_drift, quorum_size, validity};

pub use quorum_lock_common::{LockOptions, NodeConfig};
pub use tokio_util::sync::CancellationToken;
