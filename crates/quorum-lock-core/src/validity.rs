//! Quorum size and clock-drift-aware validity window
//!
//! A lock placed with lease `ttl` is trusted for
//! `ttl - elapsed - (ttl * drift_factor + CLOCK_DRIFT_MARGIN)`, where `elapsed` is the
//! time spent placing it. A non-positive window means the lock is not held.

use std::time::Duration;

use quorum_lock_common::CLOCK_DRIFT_MARGIN_MS;

/// Fixed safety margin added to the TTL-proportional drift
pub const CLOCK_DRIFT_MARGIN: Duration = Duration::from_millis(CLOCK_DRIFT_MARGIN_MS);

/// Number of nodes that must agree: a strict majority, and at least one
pub fn quorum_size(nodes: usize) -> usize {
    nodes / 2 + 1
}

/// Time reserved for clock drift between the client and the nodes
pub fn clock_drift(ttl: Duration, drift_factor: f64) -> Duration {
    ttl.mul_f64(drift_factor) + CLOCK_DRIFT_MARGIN
}

/// Remaining validity of a lock placed in `elapsed`, or `None` when it is already spent
pub fn validity(ttl: Duration, elapsed: Duration, drift_factor: f64) -> Option<Duration> {
    ttl.checked_sub(elapsed)?
        .checked_sub(clock_drift(ttl, drift_factor))
        .filter(|remaining| !remaining.is_zero())
}
