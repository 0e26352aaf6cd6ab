// Metrics for lock operations
// Recorded through the `metrics` facade; no-ops until the application installs a recorder
// Series are not labelled by resource name, which is unbounded

use std::time::Duration;

use metrics::{counter, describe_counter, describe_histogram, histogram};

/// Register metric descriptions with the installed recorder
pub fn describe_metrics() {
    describe_counter!(
        "quorum_lock_acquire_total",
        "Total number of lock acquisitions, by outcome"
    );
    describe_histogram!(
        "quorum_lock_acquire_attempts",
        "Attempts used per lock acquisition"
    );
    describe_histogram!(
        "quorum_lock_acquire_duration_seconds",
        "Lock acquisition duration in seconds, retries included"
    );
    describe_counter!("quorum_lock_release_total", "Total number of lock releases");
    describe_counter!(
        "quorum_lock_extend_total",
        "Total number of lock extensions, by outcome"
    );
    describe_counter!(
        "quorum_lock_node_failures_total",
        "Total number of failed lock node calls"
    );

    tracing::debug!("Lock metrics described");
}

/// Record an acquisition outcome ("acquired", "contended" or "cancelled")
pub fn record_acquire(outcome: &'static str, attempts: u32, elapsed: Duration) {
    counter!("quorum_lock_acquire_total", "outcome" => outcome).increment(1);
    histogram!("quorum_lock_acquire_attempts", "outcome" => outcome).record(f64::from(attempts));
    histogram!("quorum_lock_acquire_duration_seconds", "outcome" => outcome)
        .record(elapsed.as_secs_f64());
}

/// Record a release
pub fn record_release() {
    counter!("quorum_lock_release_total").increment(1);
}

/// Record an extension outcome
pub fn record_extend(extended: bool) {
    let outcome = if extended { "extended" } else { "lost" };
    counter!("quorum_lock_extend_total", "outcome" => outcome).increment(1);
}

/// Record a failed node call ("acquire", "release", "extend" or "probe")
pub fn record_node_failure(node: &str, operation: &'static str) {
    counter!("quorum_lock_node_failures_total", "node" => node.to_string(), "op" => operation)
        .increment(1);
}
