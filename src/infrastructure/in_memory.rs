use crate::domain::ports::{AsyncKeyValueBackend, KeyTtl, KeyValueBackend};
use crate::error::StoreResult;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone)]
struct Entry {
    value: Vec<u8>,
    expires_at: Option<Instant>,
}

/// Deadline `ttl` from now; `None` when it lies beyond the clock's range.
fn deadline(ttl: Duration) -> Option<Instant> {
    Instant::now().checked_add(ttl)
}

impl Entry {
    fn new(value: Vec<u8>, ttl: Duration) -> Self {
        Self {
            value,
            expires_at: deadline(ttl),
        }
    }

    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|deadline| deadline > now)
    }
}

/// A thread-safe in-memory TTL key-value backend.
///
/// Uses `Arc<Mutex<HashMap<String, Entry>>>` so every conditional operation
/// runs under one critical section. Expired entries are invisible to every
/// operation and dropped lazily. Time is read through `tokio::time`, so
/// tests running on a paused clock can advance past a TTL without sleeping.
#[derive(Default, Clone)]
pub struct InMemoryBackend {
    entries: Arc<Mutex<HashMap<String, Entry>>>,
}

impl InMemoryBackend {
    /// Creates a new, empty in-memory backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops every expired entry, returning how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, entry| entry.is_live(now));
        before - entries.len()
    }

    /// Inserts an entry that never expires.
    pub fn set_persistent(&self, key: &str, value: Vec<u8>) {
        self.entries.lock().insert(
            key.to_string(),
            Entry {
                value,
                expires_at: None,
            },
        );
    }

    /// Runs `f` on the live entry for `key`, dropping it first if expired.
    fn with_live<R>(
        &self,
        key: &str,
        f: impl FnOnce(&mut HashMap<String, Entry>, bool) -> R,
    ) -> R {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        if entries.get(key).is_some_and(|entry| !entry.is_live(now)) {
            entries.remove(key);
        }
        let live = entries.contains_key(key);
        f(&mut entries, live)
    }
}

impl KeyValueBackend for InMemoryBackend {
    fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        Ok(self.with_live(key, |entries, _| {
            entries.get(key).map(|entry| entry.value.clone())
        }))
    }

    fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> StoreResult<()> {
        self.entries
            .lock()
            .insert(key.to_string(), Entry::new(value, ttl));
        Ok(())
    }

    fn set_if_absent(&self, key: &str, value: Vec<u8>, ttl: Duration) -> StoreResult<bool> {
        Ok(self.with_live(key, |entries, live| {
            if live {
                return false;
            }
            entries.insert(key.to_string(), Entry::new(value, ttl));
            true
        }))
    }

    fn delete(&self, key: &str) -> StoreResult<bool> {
        Ok(self.with_live(key, |entries, _| entries.remove(key).is_some()))
    }

    fn delete_if_equals(&self, key: &str, expected: &[u8]) -> StoreResult<bool> {
        Ok(self.with_live(key, |entries, _| {
            if entries.get(key).is_some_and(|entry| entry.value == expected) {
                entries.remove(key);
                true
            } else {
                false
            }
        }))
    }

    fn expire_if_equals(&self, key: &str, expected: &[u8], ttl: Duration) -> StoreResult<bool> {
        Ok(self.with_live(key, |entries, _| match entries.get_mut(key) {
            Some(entry) if entry.value == expected => {
                entry.expires_at = deadline(ttl);
                true
            }
            _ => false,
        }))
    }

    fn ttl(&self, key: &str) -> StoreResult<KeyTtl> {
        Ok(self.with_live(key, |entries, _| match entries.get(key) {
            None => KeyTtl::Missing,
            Some(Entry {
                expires_at: None, ..
            }) => KeyTtl::Persistent,
            Some(Entry {
                expires_at: Some(deadline),
                ..
            }) => KeyTtl::Expires(deadline.saturating_duration_since(Instant::now())),
        }))
    }

    fn keys(&self, prefix: &str) -> StoreResult<Vec<String>> {
        let now = Instant::now();
        let entries = self.entries.lock();
        let mut keys: Vec<String> = entries
            .iter()
            .filter(|(key, entry)| key.starts_with(prefix) && entry.is_live(now))
            .map(|(key, _)| key.clone())
            .collect();
        keys.sort();
        Ok(keys)
    }
}

#[async_trait]
impl AsyncKeyValueBackend for InMemoryBackend {
    async fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        KeyValueBackend::get(self, key)
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> StoreResult<()> {
        KeyValueBackend::set(self, key, value, ttl)
    }

    async fn set_if_absent(&self, key: &str, value: Vec<u8>, ttl: Duration) -> StoreResult<bool> {
        KeyValueBackend::set_if_absent(self, key, value, ttl)
    }

    async fn delete(&self, key: &str) -> StoreResult<bool> {
        KeyValueBackend::delete(self, key)
    }

    async fn delete_if_equals(&self, key: &str, expected: &[u8]) -> StoreResult<bool> {
        KeyValueBackend::delete_if_equals(self, key, expected)
    }

    async fn expire_if_equals(
        &self,
        key: &str,
        expected: &[u8],
        ttl: Duration,
    ) -> StoreResult<bool> {
        KeyValueBackend::expire_if_equals(self, key, expected, ttl)
    }

    async fn ttl(&self, key: &str) -> StoreResult<KeyTtl> {
        KeyValueBackend::ttl(self, key)
    }

    async fn keys(&self, prefix: &str) -> StoreResult<Vec<String>> {
        KeyValueBackend::keys(self, prefix)
    }
}
