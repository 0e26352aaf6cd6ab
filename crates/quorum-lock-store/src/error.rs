//! Error types for lock store operations.

use std::time::Duration;

/// Errors a single lock node can report.
///
/// Every variant is a node-level failure. A node that answers "no" (key already
/// present, value mismatch) reports `Ok(false)`, never an error.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The call did not complete within the node's timeout.
    #[error("node {node} timed out after {timeout:?}")]
    Timeout {
        /// Label of the node that timed out.
        node: String,
        /// The timeout that elapsed.
        timeout: Duration,
    },

    /// The node could not be reached or dropped the connection.
    #[error("connection error: {0}")]
    Connection(String),

    /// The node answered with something other than the expected reply.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The node descriptor cannot be turned into a connection.
    #[error("invalid node: {0}")]
    InvalidNode(String),
}
