use crate::domain::ports::{AsyncKeyValueBackend, KeyTtl, KeyValueBackend};
use crate::error::{StoreError, StoreResult};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, Direction, IteratorMode, Options};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Column Family holding every ephemeral record.
pub const CF_EPHEMERAL: &str = "ephemeral";

const HEADER_LEN: usize = 8;

/// A persistent TTL backend implementation using RocksDB.
///
/// Each value is stored behind an 8-byte big-endian header holding its
/// absolute expiry in epoch milliseconds, so leases survive a restart and
/// keep counting down on the wall clock. Expired values are treated as
/// absent and overwritten or removed lazily.
///
/// Writes are serialized through an in-process mutex, which makes the
/// conditional operations atomic; RocksDB itself refuses a second process
/// opening the same path.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDbBackend {
    db: Arc<DB>,
    write_guard: Arc<Mutex<()>>,
}

struct StoredValue {
    expires_at_millis: i64,
    payload: Vec<u8>,
}

impl StoredValue {
    fn new(payload: Vec<u8>, ttl: Duration) -> Self {
        Self {
            expires_at_millis: deadline(ttl),
            payload,
        }
    }

    fn decode(bytes: &[u8]) -> StoreResult<Self> {
        if bytes.len() < HEADER_LEN {
            return Err(StoreError::Corrupt(format!(
                "ephemeral entry shorter than its {HEADER_LEN}-byte expiry header"
            )));
        }
        let (header, payload) = bytes.split_at(HEADER_LEN);
        let mut millis = [0u8; HEADER_LEN];
        millis.copy_from_slice(header);
        Ok(Self {
            expires_at_millis: i64::from_be_bytes(millis),
            payload: payload.to_vec(),
        })
    }

    fn encode(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(HEADER_LEN + self.payload.len());
        bytes.extend_from_slice(&self.expires_at_millis.to_be_bytes());
        bytes.extend_from_slice(&self.payload);
        bytes
    }

    fn is_live(&self, now_millis: i64) -> bool {
        self.expires_at_millis > now_millis
    }
}

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

fn deadline(ttl: Duration) -> i64 {
    let ttl_millis = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
    now_millis().saturating_add(ttl_millis)
}

impl RocksDbBackend {
    /// Opens or creates a RocksDB instance at the specified path.
    ///
    /// Ensures that the "ephemeral" column family exists.
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_ephemeral = ColumnFamilyDescriptor::new(CF_EPHEMERAL, Options::default());
        let db = DB::open_cf_descriptors(&opts, path, vec![cf_ephemeral])?;

        Ok(Self {
            db: Arc::new(db),
            write_guard: Arc::new(Mutex::new(())),
        })
    }

    fn cf(&self) -> StoreResult<&ColumnFamily> {
        self.db
            .cf_handle(CF_EPHEMERAL)
            .ok_or_else(|| StoreError::unavailable("Ephemeral column family not found"))
    }

    fn live(&self, key: &str) -> StoreResult<Option<StoredValue>> {
        let cf = self.cf()?;
        match self.db.get_cf(cf, key)? {
            Some(bytes) => {
                let stored = StoredValue::decode(&bytes)?;
                Ok(stored.is_live(now_millis()).then_some(stored))
            }
            None => Ok(None),
        }
    }

    fn put(&self, key: &str, stored: &StoredValue) -> StoreResult<()> {
        let cf = self.cf()?;
        self.db.put_cf(cf, key, stored.encode())?;
        Ok(())
    }

    fn remove(&self, key: &str) -> StoreResult<()> {
        let cf = self.cf()?;
        self.db.delete_cf(cf, key)?;
        Ok(())
    }

    async fn off_runtime<T, F>(&self, op: F) -> StoreResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&RocksDbBackend) -> StoreResult<T> + Send + 'static,
    {
        let backend = self.clone();
        tokio::task::spawn_blocking(move || op(&backend))
            .await
            .map_err(|e| StoreError::Unavailable(Box::new(e)))?
    }
}

impl KeyValueBackend for RocksDbBackend {
    fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        Ok(self.live(key)?.map(|stored| stored.payload))
    }

    fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> StoreResult<()> {
        let _guard = self.write_guard.lock();
        self.put(key, &StoredValue::new(value, ttl))
    }

    fn set_if_absent(&self, key: &str, value: Vec<u8>, ttl: Duration) -> StoreResult<bool> {
        let _guard = self.write_guard.lock();
        if self.live(key)?.is_some() {
            return Ok(false);
        }
        self.put(key, &StoredValue::new(value, ttl))?;
        Ok(true)
    }

    fn delete(&self, key: &str) -> StoreResult<bool> {
        let _guard = self.write_guard.lock();
        let existed = self.live(key)?.is_some();
        self.remove(key)?;
        Ok(existed)
    }

    fn delete_if_equals(&self, key: &str, expected: &[u8]) -> StoreResult<bool> {
        let _guard = self.write_guard.lock();
        match self.live(key)? {
            Some(stored) if stored.payload == expected => {
                self.remove(key)?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn expire_if_equals(&self, key: &str, expected: &[u8], ttl: Duration) -> StoreResult<bool> {
        let _guard = self.write_guard.lock();
        match self.live(key)? {
            Some(stored) if stored.payload == expected => {
                self.put(key, &StoredValue::new(stored.payload, ttl))?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn ttl(&self, key: &str) -> StoreResult<KeyTtl> {
        Ok(match self.live(key)? {
            Some(stored) => {
                let left = stored.expires_at_millis.saturating_sub(now_millis());
                KeyTtl::Expires(Duration::from_millis(u64::try_from(left).unwrap_or(0)))
            }
            None => KeyTtl::Missing,
        })
    }

    fn keys(&self, prefix: &str) -> StoreResult<Vec<String>> {
        let cf = self.cf()?;
        let now = now_millis();
        let mut keys = Vec::new();
        let iter = self
            .db
            .iterator_cf(cf, IteratorMode::From(prefix.as_bytes(), Direction::Forward));

        for item in iter {
            let (key, value) = item?;
            if !key.starts_with(prefix.as_bytes()) {
                break;
            }
            if StoredValue::decode(&value)?.is_live(now) {
                keys.push(String::from_utf8_lossy(&key).into_owned());
            }
        }

        Ok(keys)
    }
}

/// Every call runs on tokio's blocking pool; disk I/O and the write guard
/// never hold up the calling task's worker thread.
#[async_trait]
impl AsyncKeyValueBackend for RocksDbBackend {
    async fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        let key = key.to_string();
        self.off_runtime(move |db| KeyValueBackend::get(db, &key))
            .await
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> StoreResult<()> {
        let key = key.to_string();
        self.off_runtime(move |db| KeyValueBackend::set(db, &key, value, ttl))
            .await
    }

    async fn set_if_absent(&self, key: &str, value: Vec<u8>, ttl: Duration) -> StoreResult<bool> {
        let key = key.to_string();
        self.off_runtime(move |db| KeyValueBackend::set_if_absent(db, &key, value, ttl))
            .await
    }

    async fn delete(&self, key: &str) -> StoreResult<bool> {
        let key = key.to_string();
        self.off_runtime(move |db| KeyValueBackend::delete(db, &key))
            .await
    }

    async fn delete_if_equals(&self, key: &str, expected: &[u8]) -> StoreResult<bool> {
        let key = key.to_string();
        let expected = expected.to_vec();
        self.off_runtime(move |db| KeyValueBackend::delete_if_equals(db, &key, &expected))
            .await
    }

    async fn expire_if_equals(
        &self,
        key: &str,
        expected: &[u8],
        ttl: Duration,
    ) -> StoreResult<bool> {
        let key = key.to_string();
        let expected = expected.to_vec();
        self.off_runtime(move |db| KeyValueBackend::expire_if_equals(db, &key, &expected, ttl))
            .await
    }

    async fn ttl(&self, key: &str) -> StoreResult<KeyTtl> {
        let key = key.to_string();
        self.off_runtime(move |db| KeyValueBackend::ttl(db, &key))
            .await
    }

    async fn keys(&self, prefix: &str) -> StoreResult<Vec<String>> {
        let prefix = prefix.to_string();
        self.off_runtime(move |db| KeyValueBackend::keys(db, &prefix))
            .await
    }
}
