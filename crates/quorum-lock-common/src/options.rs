//! Lock option types and layered settings loading
//!
//! Options can be built in code, deserialized from any serde source, or loaded with
//! [`LockOptions::load`], which layers an optional settings file under environment
//! variables prefixed with `QUORUM_LOCK_` (nested keys separated by `__`).

use std::path::Path;
use std::time::Duration;

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::error::SettingsError;
use crate::{
    CLOCK_DRIFT_FACTOR, DEFAULT_HOST, DEFAULT_PORT, DEFAULT_RETRY_COUNT, DEFAULT_RETRY_DELAY_MS,
    DEFAULT_SOCKET_TIMEOUT_MS, DEFAULT_TTL_MS, ENV_PREFIX,
};

/// Connection parameters for one lock node.
///
/// Either a full connection URL or discrete address fields. Address fields that are
/// left out fall back to a local node on the default port and database 0.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NodeConfig {
    Url {
        url: String,
        #[serde(default)]
        socket_timeout_ms: Option<u64>,
    },
    Address {
        #[serde(default = "default_host")]
        host: String,
        #[serde(default = "default_port")]
        port: u16,
        #[serde(default)]
        db: i64,
        #[serde(default)]
        password: Option<String>,
        #[serde(default)]
        socket_timeout_ms: Option<u64>,
    },
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self::Address {
            host: default_host(),
            port: DEFAULT_PORT,
            db: 0,
            password: None,
            socket_timeout_ms: None,
        }
    }
}

impl NodeConfig {
    /// Node addressed by a connection URL
    pub fn url(url: impl Into<String>) -> Self {
        Self::Url {
            url: url.into(),
            socket_timeout_ms: None,
        }
    }

    /// Node addressed by host and port, database 0
    pub fn address(host: impl Into<String>, port: u16) -> Self {
        Self::Address {
            host: host.into(),
            port,
            db: 0,
            password: None,
            socket_timeout_ms: None,
        }
    }

    /// Select a logical database (no effect on URL nodes, which carry their own)
    pub fn with_db(mut self, database: i64) -> Self {
        if let Self::Address { db, .. } = &mut self {
            *db = database;
        }
        self
    }

    /// Set the per-call timeout in milliseconds
    pub fn with_socket_timeout_ms(mut self, timeout_ms: u64) -> Self {
        match &mut self {
            Self::Url {
                socket_timeout_ms, ..
            }
            | Self::Address {
                socket_timeout_ms, ..
            } => *socket_timeout_ms = Some(timeout_ms),
        }
        self
    }

    /// Per-call timeout, falling back to the default when unset
    pub fn socket_timeout(&self) -> Duration {
        let ms = match self {
            Self::Url {
                socket_timeout_ms, ..
            }
            | Self::Address {
                socket_timeout_ms, ..
            } => socket_timeout_ms.unwrap_or(DEFAULT_SOCKET_TIMEOUT_MS),
        };
        Duration::from_millis(ms)
    }
}

/// Options for one quorum lock
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LockOptions {
    /// Lock nodes; a single local node when not configured
    pub nodes: Vec<NodeConfig>,
    /// Lease duration in milliseconds
    pub ttl_ms: u64,
    /// Maximum acquisition attempts
    pub retry_count: u32,
    /// Upper bound of the random delay between attempts, in milliseconds
    pub retry_delay_ms: u64,
    /// Fraction of the TTL reserved for clock drift
    pub drift_factor: f64,
}

impl Default for LockOptions {
    fn default() -> Self {
        Self {
            nodes: vec![NodeConfig::default()],
            ttl_ms: DEFAULT_TTL_MS,
            retry_count: DEFAULT_RETRY_COUNT,
            retry_delay_ms: DEFAULT_RETRY_DELAY_MS,
            drift_factor: CLOCK_DRIFT_FACTOR,
        }
    }
}

impl LockOptions {
    /// Load options from an optional settings file, overridden by `QUORUM_LOCK_*`
    /// environment variables. Missing keys keep their defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, SettingsError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(true));
        }
        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let options: LockOptions = builder.build()?.try_deserialize()?;
        options.validate()?;
        tracing::debug!(
            nodes = options.nodes.len(),
            ttl_ms = options.ttl_ms,
            retry_count = options.retry_count,
            "Loaded lock options"
        );
        Ok(options)
    }

    /// Check that the options describe a usable lock
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.ttl_ms == 0 {
            return Err(invalid("ttl_ms", "must be greater than zero"));
        }
        if self.retry_count == 0 {
            return Err(invalid("retry_count", "at least one attempt is required"));
        }
        if !self.drift_factor.is_finite() || !(0.0..1.0).contains(&self.drift_factor) {
            return Err(invalid("drift_factor", "must be within [0, 1)"));
        }
        Ok(())
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

fn invalid(key: &str, message: &str) -> SettingsError {
    SettingsError::Invalid {
        key: key.to_string(),
        message: message.to_string(),
    }
}
