use crate::config::{KeyspaceSettings, whole_seconds};
use crate::domain::ports::{KeyTtl, SharedAsyncBackend, SharedBackend};
use crate::domain::records::{ExclusiveLockDocument, UniqueIdDocument};
use crate::error::StoreResult;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;

/// Extracts the record key from a value.
pub type KeyFn<V> = Arc<dyn Fn(&V) -> String + Send + Sync>;

/// A stored value together with the exact bytes it was read from.
pub(crate) struct Snapshot<V> {
    pub(crate) raw: Vec<u8>,
    pub(crate) value: V,
}

fn decode<V: DeserializeOwned>(raw: Vec<u8>) -> StoreResult<Snapshot<V>> {
    let value = serde_json::from_slice(&raw)?;
    Ok(Snapshot { raw, value })
}

fn strip_keyspace(settings: &KeyspaceSettings, keys: Vec<String>) -> Vec<String> {
    let prefix = settings.prefix();
    keys.into_iter()
        .filter_map(|key| key.strip_prefix(&prefix).map(str::to_string))
        .collect()
}

/// Keyspace-scoped typed store over a blocking TTL backend.
///
/// Values are stored as JSON under `"{keyspace}:{key_of(value)}"`. Every
/// write carries a TTL, truncated to whole seconds.
pub struct EphemeralStore<V> {
    backend: SharedBackend,
    settings: KeyspaceSettings,
    key_of: KeyFn<V>,
}

impl<V> Clone for EphemeralStore<V> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            settings: self.settings.clone(),
            key_of: Arc::clone(&self.key_of),
        }
    }
}

impl<V> EphemeralStore<V>
where
    V: Serialize + DeserializeOwned,
{
    /// Creates a new store bound to `settings.keyspace`.
    ///
    /// # Arguments
    ///
    /// * `backend` - The shared TTL key-value backend.
    /// * `settings` - Keyspace and default TTL.
    /// * `key_of` - Derives the record key from a value.
    pub fn new(
        backend: SharedBackend,
        settings: KeyspaceSettings,
        key_of: impl Fn(&V) -> String + Send + Sync + 'static,
    ) -> Self {
        Self {
            backend,
            settings,
            key_of: Arc::new(key_of),
        }
    }

    pub fn settings(&self) -> &KeyspaceSettings {
        &self.settings
    }

    pub fn key_of(&self, value: &V) -> String {
        (self.key_of)(value)
    }

    /// Upserts `value` with the store's default TTL.
    pub fn save(&self, value: &V) -> StoreResult<()> {
        self.put(value, self.settings.default_ttl())
    }

    /// Inserts `value` with the store's default TTL unless its key exists.
    pub fn save_if_absent(&self, value: &V) -> StoreResult<bool> {
        self.put_if_absent(value, self.settings.default_ttl())
    }

    /// Upserts `value`, restarting its expiration from `ttl`.
    pub fn put(&self, value: &V, ttl: Duration) -> StoreResult<()> {
        let ttl = whole_seconds(ttl)?;
        let key = self.settings.compound_key(&self.key_of(value));
        self.backend.set(&key, serde_json::to_vec(value)?, ttl)
    }

    /// Atomic conditional insert. Returns `false` without modifying the
    /// existing record when the key is already present.
    pub fn put_if_absent(&self, value: &V, ttl: Duration) -> StoreResult<bool> {
        let ttl = whole_seconds(ttl)?;
        let key = self.settings.compound_key(&self.key_of(value));
        let inserted = self
            .backend
            .set_if_absent(&key, serde_json::to_vec(value)?, ttl)?;
        tracing::debug!(key = %key, inserted, "Conditional insert");
        Ok(inserted)
    }

    pub fn get(&self, key: &str) -> StoreResult<Option<V>> {
        Ok(self.snapshot(key)?.map(|snapshot| snapshot.value))
    }

    /// Removes the record regardless of its remaining TTL. Returns whether
    /// a record was removed.
    pub fn delete(&self, key: &str) -> StoreResult<bool> {
        self.backend.delete(&self.settings.compound_key(key))
    }

    pub fn ttl_of(&self, key: &str) -> StoreResult<KeyTtl> {
        self.backend.ttl(&self.settings.compound_key(key))
    }

    /// Record keys of the keyspace, without the keyspace prefix.
    pub fn keys_in_keyspace(&self) -> StoreResult<Vec<String>> {
        let keys = self.backend.keys(&self.settings.prefix())?;
        Ok(strip_keyspace(&self.settings, keys))
    }

    /// Every live value of the keyspace. Records expiring between the key
    /// listing and the read are skipped.
    pub fn values_in_keyspace(&self) -> StoreResult<Vec<V>> {
        let mut values = Vec::new();
        for key in self.keys_in_keyspace()? {
            if let Some(value) = self.get(&key)? {
                values.push(value);
            }
        }
        Ok(values)
    }

    pub(crate) fn snapshot(&self, key: &str) -> StoreResult<Option<Snapshot<V>>> {
        self.backend
            .get(&self.settings.compound_key(key))?
            .map(decode)
            .transpose()
    }

    pub(crate) fn delete_if_unchanged(&self, key: &str, raw: &[u8]) -> StoreResult<bool> {
        self.backend
            .delete_if_equals(&self.settings.compound_key(key), raw)
    }

    pub(crate) fn expire_if_unchanged(
        &self,
        key: &str,
        raw: &[u8],
        ttl: Duration,
    ) -> StoreResult<bool> {
        let ttl = whole_seconds(ttl)?;
        self.backend
            .expire_if_equals(&self.settings.compound_key(key), raw, ttl)
    }
}

/// Non-blocking twin of [`EphemeralStore`] with identical semantics.
pub struct AsyncEphemeralStore<V> {
    backend: SharedAsyncBackend,
    settings: KeyspaceSettings,
    key_of: KeyFn<V>,
}

impl<V> Clone for AsyncEphemeralStore<V> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            settings: self.settings.clone(),
            key_of: Arc::clone(&self.key_of),
        }
    }
}

impl<V> AsyncEphemeralStore<V>
where
    V: Serialize + DeserializeOwned + Send + Sync,
{
    pub fn new(
        backend: SharedAsyncBackend,
        settings: KeyspaceSettings,
        key_of: impl Fn(&V) -> String + Send + Sync + 'static,
    ) -> Self {
        Self {
            backend,
            settings,
            key_of: Arc::new(key_of),
        }
    }

    pub fn settings(&self) -> &KeyspaceSettings {
        &self.settings
    }

    pub fn key_of(&self, value: &V) -> String {
        (self.key_of)(value)
    }

    pub async fn save(&self, value: &V) -> StoreResult<()> {
        self.put(value, self.settings.default_ttl()).await
    }

    pub async fn save_if_absent(&self, value: &V) -> StoreResult<bool> {
        self.put_if_absent(value, self.settings.default_ttl()).await
    }

    pub async fn put(&self, value: &V, ttl: Duration) -> StoreResult<()> {
        let ttl = whole_seconds(ttl)?;
        let key = self.settings.compound_key(&self.key_of(value));
        let bytes = serde_json::to_vec(value)?;
        self.backend.set(&key, bytes, ttl).await
    }

    pub async fn put_if_absent(&self, value: &V, ttl: Duration) -> StoreResult<bool> {
        let ttl = whole_seconds(ttl)?;
        let key = self.settings.compound_key(&self.key_of(value));
        let bytes = serde_json::to_vec(value)?;
        let inserted = self.backend.set_if_absent(&key, bytes, ttl).await?;
        tracing::debug!(key = %key, inserted, "Conditional insert");
        Ok(inserted)
    }

    pub async fn get(&self, key: &str) -> StoreResult<Option<V>> {
        Ok(self.snapshot(key).await?.map(|snapshot| snapshot.value))
    }

    pub async fn delete(&self, key: &str) -> StoreResult<bool> {
        self.backend.delete(&self.settings.compound_key(key)).await
    }

    pub async fn ttl_of(&self, key: &str) -> StoreResult<KeyTtl> {
        self.backend.ttl(&self.settings.compound_key(key)).await
    }

    pub async fn keys_in_keyspace(&self) -> StoreResult<Vec<String>> {
        let keys = self.backend.keys(&self.settings.prefix()).await?;
        Ok(strip_keyspace(&self.settings, keys))
    }

    pub async fn values_in_keyspace(&self) -> StoreResult<Vec<V>> {
        let mut values = Vec::new();
        for key in self.keys_in_keyspace().await? {
            if let Some(value) = self.get(&key).await? {
                values.push(value);
            }
        }
        Ok(values)
    }

    pub(crate) async fn snapshot(&self, key: &str) -> StoreResult<Option<Snapshot<V>>> {
        self.backend
            .get(&self.settings.compound_key(key))
            .await?
            .map(decode)
            .transpose()
    }

    pub(crate) async fn delete_if_unchanged(&self, key: &str, raw: &[u8]) -> StoreResult<bool> {
        self.backend
            .delete_if_equals(&self.settings.compound_key(key), raw)
            .await
    }

    pub(crate) async fn expire_if_unchanged(
        &self,
        key: &str,
        raw: &[u8],
        ttl: Duration,
    ) -> StoreResult<bool> {
        let ttl = whole_seconds(ttl)?;
        self.backend
            .expire_if_equals(&self.settings.compound_key(key), raw, ttl)
            .await
    }
}

/// Idempotency markers for generated ids.
pub type UniqueIdStore = EphemeralStore<UniqueIdDocument>;
pub type AsyncUniqueIdStore = AsyncEphemeralStore<UniqueIdDocument>;

impl UniqueIdStore {
    pub fn unique_ids(backend: SharedBackend, settings: KeyspaceSettings) -> Self {
        Self::new(backend, settings, UniqueIdDocument::key)
    }
}

impl AsyncUniqueIdStore {
    pub fn unique_ids(backend: SharedAsyncBackend, settings: KeyspaceSettings) -> Self {
        Self::new(backend, settings, UniqueIdDocument::key)
    }
}

pub(crate) fn lock_store(
    backend: SharedBackend,
    settings: KeyspaceSettings,
) -> EphemeralStore<ExclusiveLockDocument> {
    EphemeralStore::new(backend, settings, ExclusiveLockDocument::key)
}

pub(crate) fn async_lock_store(
    backend: SharedAsyncBackend,
    settings: KeyspaceSettings,
) -> AsyncEphemeralStore<ExclusiveLockDocument> {
    AsyncEphemeralStore::new(backend, settings, ExclusiveLockDocument::key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::infrastructure::in_memory::InMemoryBackend;

    fn settings() -> KeyspaceSettings {
        KeyspaceSettings::new("uniqueIds", Duration::from_secs(60)).unwrap()
    }

    fn store(backend: &InMemoryBackend) -> UniqueIdStore {
        UniqueIdStore::unique_ids(Arc::new(backend.clone()), settings())
    }

    #[test]
    fn test_put_and_get() {
        let backend = InMemoryBackend::new();
        let store = store(&backend);
        let doc = UniqueIdDocument::new("E1700000000001");

        store.save(&doc).unwrap();
        assert_eq!(store.get("E1700000000001").unwrap(), Some(doc.clone()));

        // Replaying the same write is safe.
        store.save(&doc).unwrap();
        assert_eq!(store.keys_in_keyspace().unwrap(), vec!["E1700000000001".to_string()]);
    }

    #[test]
    fn test_records_are_keyspace_prefixed() {
        let backend = InMemoryBackend::new();
        store(&backend).save(&UniqueIdDocument::new("id-1")).unwrap();

        assert!(
            crate::domain::ports::KeyValueBackend::get(&backend, "uniqueIds:id-1")
                .unwrap()
                .is_some()
        );
    }

    #[test]
    fn test_put_if_absent() {
        let backend = InMemoryBackend::new();
        let store = store(&backend);
        let first = UniqueIdDocument::new("id-1");
        let mut second = UniqueIdDocument::new("id-1");
        second.creation_date = "2000-01-01T00:00:00.000Z".to_string();

        assert!(store.save_if_absent(&first).unwrap());
        assert!(!store.save_if_absent(&second).unwrap());
        assert_eq!(store.get("id-1").unwrap(), Some(first));
    }

    #[test]
    fn test_delete_reports_removal() {
        let backend = InMemoryBackend::new();
        let store = store(&backend);
        store.save(&UniqueIdDocument::new("id-1")).unwrap();

        assert!(store.delete("id-1").unwrap());
        assert!(!store.delete("id-1").unwrap());
        assert_eq!(store.get("id-1").unwrap(), None);
    }

    #[test]
    fn test_ttl_is_truncated_and_validated() {
        let backend = InMemoryBackend::new();
        let store = store(&backend);
        let doc = UniqueIdDocument::new("id-1");

        assert!(matches!(
            store.put(&doc, Duration::from_millis(900)),
            Err(StoreError::InvalidTtl(_))
        ));

        store.put(&doc, Duration::from_millis(2900)).unwrap();
        match store.ttl_of("id-1").unwrap() {
            KeyTtl::Expires(left) => assert!(left <= Duration::from_secs(2)),
            other => panic!("unexpected ttl {other:?}"),
        }
        assert_eq!(store.ttl_of("missing").unwrap(), KeyTtl::Missing);
    }

    #[test]
    fn test_values_in_keyspace() {
        let backend = InMemoryBackend::new();
        let store = store(&backend);
        let other = UniqueIdStore::unique_ids(
            Arc::new(backend.clone()),
            KeyspaceSettings::new("other", Duration::from_secs(60)).unwrap(),
        );
        store.save(&UniqueIdDocument::new("a")).unwrap();
        store.save(&UniqueIdDocument::new("b")).unwrap();
        other.save(&UniqueIdDocument::new("c")).unwrap();

        let mut ids: Vec<String> = store
            .values_in_keyspace()
            .unwrap()
            .into_iter()
            .map(|doc| doc.id)
            .collect();
        ids.sort();
        assert_eq!(ids, vec!["a".to_string(), "b".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_async_record_expires() {
        let backend = InMemoryBackend::new();
        let store = AsyncUniqueIdStore::unique_ids(Arc::new(backend), settings());
        let doc = UniqueIdDocument::new("id-1");

        store.put(&doc, Duration::from_secs(1)).await.unwrap();
        assert_eq!(store.get("id-1").await.unwrap(), Some(doc));

        tokio::time::advance(Duration::from_millis(1100)).await;

        assert_eq!(store.get("id-1").await.unwrap(), None);
        assert!(store.keys_in_keyspace().await.unwrap().is_empty());
    }
}
