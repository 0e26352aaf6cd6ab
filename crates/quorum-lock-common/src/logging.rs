//! Logging bootstrap for binaries and tests embedding quorum-lock.
//!
//! Library code only emits `tracing` events; installing a subscriber is left to the
//! application. These helpers install a console subscriber with an `EnvFilter` that
//! honours `RUST_LOG` and falls back to the given directive.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// Install a console subscriber.
///
/// Returns `false` when a global subscriber was already installed.
pub fn init_tracing(default_directive: &str) -> bool {
    tracing_subscriber::registry()
        .with(env_filter(default_directive))
        .with(fmt::layer().with_target(true))
        .try_init()
        .is_ok()
}

/// Install a subscriber that writes through the test harness capture.
///
/// Safe to call from every test; only the first call installs anything.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::registry()
        .with(env_filter("quorum_lock=debug"))
        .with(fmt::layer().with_test_writer())
        .try_init();
}

fn env_filter(default_directive: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive))
}
