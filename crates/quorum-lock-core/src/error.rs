//! Lock error types

use quorum_lock_common::SettingsError;
use quorum_lock_store::StoreError;

/// Error type for quorum lock construction and scoped acquisition.
///
/// Acquire, release, extend and liveness checks never fail with an error; they report
/// through their return values. Only construction and [`crate::QuorumLock::with_lock`]
/// return `LockError`.
#[derive(Debug, thiserror::Error)]
pub enum LockError {
    #[error("could not acquire lock '{resource}' after {attempts} attempt(s)")]
    Acquisition { resource: String, attempts: u32 },

    #[error("invalid lock options: {0}")]
    Config(#[from] SettingsError),

    #[error("lock node error: {0}")]
    Store(#[from] StoreError),
}

impl LockError {
    /// Whether the lock was contended (as opposed to misconfigured)
    pub fn is_acquisition(&self) -> bool {
        matches!(self, Self::Acquisition { .. })
    }
}

pub type Result<T> = std::result::Result<T, LockError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = LockError::Acquisition {
            resource: "orders".to_string(),
            attempts: 3,
        };
        assert_eq!(
            err.to_string(),
            "could not acquire lock 'orders' after 3 attempt(s)"
        );
        assert!(err.is_acquisition());

        let err: LockError = StoreError::InvalidNode("ftp://x".to_string()).into();
        assert_eq!(err.to_string(), "lock node error: invalid node: ftp://x");
        assert!(!err.is_acquisition());
    }

    #[test]
    fn test_from_settings_error() {
        let err: LockError = SettingsError::Invalid {
            key: "retry_count".to_string(),
            message: "at least one attempt is required".to_string(),
        }
        .into();
        assert!(matches!(err, LockError::Config(_)));
    }
}
