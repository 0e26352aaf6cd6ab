//! In-memory lock store with per-key expiry.
//!
//! Mirrors the semantics of a Redis node for the lock primitives: a key whose expiry
//! has passed behaves exactly like an absent key. Expired entries are swept on every
//! write of a new value, so keys of resources that are never locked again do not
//! accumulate.

use std::time::{Duration, Instant};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use crate::error::StoreError;
use crate::traits::LockStore;

struct StoredValue {
    value: String,
    expires_at: Instant,
}

impl StoredValue {
    fn new(value: &str, ttl: Duration) -> Self {
        Self {
            value: value.to_string(),
            expires_at: Instant::now() + ttl,
        }
    }

    fn is_live(&self, now: Instant) -> bool {
        self.expires_at > now
    }
}

/// A single in-process lock node
#[derive(Default)]
pub struct MemoryStore {
    entries: DashMap<String, StoredValue>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live keys
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries.iter().filter(|e| e.is_live(now)).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every expired key
    fn sweep_expired(&self, now: Instant) {
        self.entries.retain(|_, stored| stored.is_live(now));
    }

    /// Drop every key, live or not
    pub fn clear(&self) {
        self.entries.clear();
    }
}

#[async_trait::async_trait]
impl LockStore for MemoryStore {
    async fn set_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<bool, StoreError> {
        let now = Instant::now();
        self.sweep_expired(now);
        match self.entries.entry(key.to_string()) {
            Entry::Occupied(mut entry) => {
                if entry.get().is_live(now) {
                    return Ok(false);
                }
                entry.insert(StoredValue::new(value, ttl));
                Ok(true)
            }
            Entry::Vacant(entry) => {
                entry.insert(StoredValue::new(value, ttl));
                Ok(true)
            }
        }
    }

    async fn delete_if_equals(&self, key: &str, value: &str) -> Result<bool, StoreError> {
        let now = Instant::now();
        Ok(self
            .entries
            .remove_if(key, |_, stored| stored.is_live(now) && stored.value == value)
            .is_some())
    }

    async fn extend_if_equals(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<bool, StoreError> {
        let now = Instant::now();
        match self.entries.get_mut(key) {
            Some(mut stored) if stored.is_live(now) && stored.value == value => {
                stored.expires_at = now + ttl;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let now = Instant::now();
        Ok(self
            .entries
            .get(key)
            .and_then(|stored| stored.is_live(now).then(|| stored.value.clone())))
    }
}
