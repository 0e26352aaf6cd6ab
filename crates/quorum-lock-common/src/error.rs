//! Settings error types

/// Error raised while loading [`crate::LockOptions`] from files or the environment
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("failed to load settings: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid setting '{key}': {message}")]
    Invalid { key: String, message: String },
}
