//! Quorum Lock Common - Shared option types and ambient plumbing
//!
//! This crate provides the foundational pieces used across all quorum-lock components:
//! - Lock and node option types (`LockOptions`, `NodeConfig`)
//! - Layered settings loading (file + environment)
//! - Logging bootstrap
//! - Common constants

pub mod error;
pub mod logging;
pub mod options;

// Re-exports for convenience
pub use error::SettingsError;
pub use options::{LockOptions, NodeConfig};

/// Fraction of the TTL reserved for clock drift between the client and the nodes
pub const CLOCK_DRIFT_FACTOR: f64 = 0.01;

/// Fixed safety margin added on top of the TTL-proportional drift, in milliseconds
pub const CLOCK_DRIFT_MARGIN_MS: u64 = 2;

/// Default lease duration in milliseconds
pub const DEFAULT_TTL_MS: u64 = 10_000;

/// Default maximum number of acquisition attempts
pub const DEFAULT_RETRY_COUNT: u32 = 3;

/// Default upper bound of the jittered delay between attempts, in milliseconds
pub const DEFAULT_RETRY_DELAY_MS: u64 = 200;

/// Default node host
pub const DEFAULT_HOST: &str = "localhost";

/// Default node port
pub const DEFAULT_PORT: u16 = 6379;

/// Default per-call node timeout in milliseconds
pub const DEFAULT_SOCKET_TIMEOUT_MS: u64 = 500;

/// Environment variable prefix recognized by [`LockOptions::load`]
pub const ENV_PREFIX: &str = "QUORUM_LOCK";
