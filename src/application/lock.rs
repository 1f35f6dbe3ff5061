use crate::application::store::{
    AsyncEphemeralStore, EphemeralStore, Snapshot, async_lock_store, lock_store,
};
use crate::config::KeyspaceSettings;
use crate::domain::ports::{KeyTtl, SharedAsyncBackend, SharedBackend};
use crate::domain::records::ExclusiveLockDocument;
use crate::error::{LockError, LockResult};
use std::time::Duration;

/// Observable state of one lock resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockState {
    Unlocked,
    Locked {
        holder: String,
        /// Acquisition timestamp, RFC 3339.
        since: String,
    },
}

impl LockState {
    pub fn holder(&self) -> Option<&str> {
        match self {
            LockState::Unlocked => None,
            LockState::Locked { holder, .. } => Some(holder),
        }
    }
}

impl From<Option<ExclusiveLockDocument>> for LockState {
    fn from(document: Option<ExclusiveLockDocument>) -> Self {
        match document {
            Some(doc) => LockState::Locked {
                holder: doc.holder_name,
                since: doc.creation_date,
            },
            None => LockState::Unlocked,
        }
    }
}

fn not_owner(resource: &str, holder: &str, current: Option<&ExclusiveLockDocument>) -> LockError {
    let current_holder = current.map(|doc| doc.holder_name.clone());
    tracing::warn!(
        resource,
        holder,
        current_holder = ?current_holder,
        "Lock not owned by caller"
    );
    LockError::NotOwner {
        resource: resource.to_string(),
        holder: holder.to_string(),
        current_holder,
    }
}

/// Returns the raw bytes of the record if `holder` owns it.
fn owned_raw(
    resource: &str,
    holder: &str,
    current: Option<Snapshot<ExclusiveLockDocument>>,
) -> LockResult<Vec<u8>> {
    match current {
        Some(snapshot) if snapshot.value.holder_name == holder => Ok(snapshot.raw),
        Some(snapshot) => Err(not_owner(resource, holder, Some(&snapshot.value))),
        None => Err(not_owner(resource, holder, None)),
    }
}

/// Lease-based distributed mutual exclusion over an [`EphemeralStore`].
///
/// At most one live lock record exists per resource; exclusion relies only
/// on the backend's atomic conditional insert. A crashed holder's lock
/// heals when its lease expires. Release and renew act only if the stored
/// record is still byte-for-byte the one the caller owns, so a holder whose
/// lease lapsed can never touch a lock reacquired by someone else.
#[derive(Clone)]
pub struct ExclusiveLock {
    store: EphemeralStore<ExclusiveLockDocument>,
}

impl ExclusiveLock {
    /// Creates a new lock primitive over `settings.keyspace`. The keyspace
    /// TTL is the default lease.
    pub fn new(backend: SharedBackend, settings: KeyspaceSettings) -> Self {
        Self {
            store: lock_store(backend, settings),
        }
    }

    pub fn default_lease(&self) -> Duration {
        self.store.settings().default_ttl()
    }

    /// Tries once to take the lock. No retry; callers own the retry policy.
    pub fn acquire(&self, resource: &str, holder: &str, lease: Duration) -> LockResult<bool> {
        let document = ExclusiveLockDocument::new(resource, holder);
        let acquired = self.store.put_if_absent(&document, lease)?;
        tracing::info!(resource, holder, acquired, "Lock acquire");
        Ok(acquired)
    }

    /// Deletes the lock if `holder` still owns it.
    pub fn release(&self, resource: &str, holder: &str) -> LockResult<()> {
        let raw = owned_raw(resource, holder, self.store.snapshot(resource)?)?;
        if !self.store.delete_if_unchanged(resource, &raw)? {
            let current = self.store.get(resource)?;
            return Err(not_owner(resource, holder, current.as_ref()));
        }
        tracing::info!(resource, holder, "Lock released");
        Ok(())
    }

    /// Restarts the lease from `lease` if `holder` still owns the lock.
    pub fn renew(&self, resource: &str, holder: &str, lease: Duration) -> LockResult<()> {
        let raw = owned_raw(resource, holder, self.store.snapshot(resource)?)?;
        if !self.store.expire_if_unchanged(resource, &raw, lease)? {
            let current = self.store.get(resource)?;
            return Err(not_owner(resource, holder, current.as_ref()));
        }
        tracing::info!(resource, holder, lease_secs = lease.as_secs(), "Lock renewed");
        Ok(())
    }

    pub fn state(&self, resource: &str) -> LockResult<LockState> {
        Ok(self.store.get(resource)?.into())
    }

    pub fn holder(&self, resource: &str) -> LockResult<Option<String>> {
        Ok(self.store.get(resource)?.map(|doc| doc.holder_name))
    }

    /// Remaining lease of the resource.
    pub fn lease_of(&self, resource: &str) -> LockResult<KeyTtl> {
        Ok(self.store.ttl_of(resource)?)
    }
}

/// Non-blocking twin of [`ExclusiveLock`] with identical semantics.
#[derive(Clone)]
pub struct AsyncExclusiveLock {
    store: AsyncEphemeralStore<ExclusiveLockDocument>,
}

impl AsyncExclusiveLock {
    pub fn new(backend: SharedAsyncBackend, settings: KeyspaceSettings) -> Self {
        Self {
            store: async_lock_store(backend, settings),
        }
    }

    pub fn default_lease(&self) -> Duration {
        self.store.settings().default_ttl()
    }

    pub async fn acquire(&self, resource: &str, holder: &str, lease: Duration) -> LockResult<bool> {
        let document = ExclusiveLockDocument::new(resource, holder);
        let acquired = self.store.put_if_absent(&document, lease).await?;
        tracing::info!(resource, holder, acquired, "Lock acquire");
        Ok(acquired)
    }

    pub async fn release(&self, resource: &str, holder: &str) -> LockResult<()> {
        let raw = owned_raw(resource, holder, self.store.snapshot(resource).await?)?;
        if !self.store.delete_if_unchanged(resource, &raw).await? {
            let current = self.store.get(resource).await?;
            return Err(not_owner(resource, holder, current.as_ref()));
        }
        tracing::info!(resource, holder, "Lock released");
        Ok(())
    }

    pub async fn renew(&self, resource: &str, holder: &str, lease: Duration) -> LockResult<()> {
        let raw = owned_raw(resource, holder, self.store.snapshot(resource).await?)?;
        if !self.store.expire_if_unchanged(resource, &raw, lease).await? {
            let current = self.store.get(resource).await?;
            return Err(not_owner(resource, holder, current.as_ref()));
        }
        tracing::info!(resource, holder, lease_secs = lease.as_secs(), "Lock renewed");
        Ok(())
    }

    pub async fn state(&self, resource: &str) -> LockResult<LockState> {
        Ok(self.store.get(resource).await?.into())
    }

    pub async fn holder(&self, resource: &str) -> LockResult<Option<String>> {
        Ok(self.store.get(resource).await?.map(|doc| doc.holder_name))
    }

    pub async fn lease_of(&self, resource: &str) -> LockResult<KeyTtl> {
        Ok(self.store.ttl_of(resource).await?)
    }
}
