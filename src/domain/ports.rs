use crate::error::StoreResult;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Remaining lifetime of a backend key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyTtl {
    /// The key exists and never expires.
    Persistent,
    /// The key does not exist (or already expired).
    Missing,
    Expires(Duration),
}

/// Blocking TTL-capable key-value backend.
///
/// `set_if_absent`, `delete_if_equals` and `expire_if_equals` must be atomic
/// with respect to every other caller of the same backend; the lock primitive
/// relies on them and nothing else for mutual exclusion. An expired key is
/// absent for every operation.
pub trait KeyValueBackend: Send + Sync {
    fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>>;

    /// Upserts `value`, restarting its expiration from `ttl`.
    fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> StoreResult<()>;

    /// Inserts only if `key` is absent. Returns `false` without touching the
    /// existing entry otherwise.
    fn set_if_absent(&self, key: &str, value: Vec<u8>, ttl: Duration) -> StoreResult<bool>;

    /// Returns `true` if a live entry was removed.
    fn delete(&self, key: &str) -> StoreResult<bool>;

    /// Removes the entry only if its current value is exactly `expected`.
    fn delete_if_equals(&self, key: &str, expected: &[u8]) -> StoreResult<bool>;

    /// Restarts the expiration of the entry only if its current value is
    /// exactly `expected`.
    fn expire_if_equals(&self, key: &str, expected: &[u8], ttl: Duration) -> StoreResult<bool>;

    fn ttl(&self, key: &str) -> StoreResult<KeyTtl>;

    /// Live keys starting with `prefix`.
    fn keys(&self, prefix: &str) -> StoreResult<Vec<String>>;
}

/// Non-blocking twin of [`KeyValueBackend`] with identical semantics.
///
/// Each call performs a single backend round-trip; dropping the returned
/// future before completion abandons the request.
#[async_trait]
pub trait AsyncKeyValueBackend: Send + Sync {
    async fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>>;
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> StoreResult<()>;
    async fn set_if_absent(&self, key: &str, value: Vec<u8>, ttl: Duration) -> StoreResult<bool>;
    async fn delete(&self, key: &str) -> StoreResult<bool>;
    async fn delete_if_equals(&self, key: &str, expected: &[u8]) -> StoreResult<bool>;
    async fn expire_if_equals(
        &self,
        key: &str,
        expected: &[u8],
        ttl: Duration,
    ) -> StoreResult<bool>;
    async fn ttl(&self, key: &str) -> StoreResult<KeyTtl>;
    async fn keys(&self, prefix: &str) -> StoreResult<Vec<String>>;
}

pub type SharedBackend = Arc<dyn KeyValueBackend>;
pub type SharedAsyncBackend = Arc<dyn AsyncKeyValueBackend>;
