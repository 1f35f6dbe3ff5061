use crate::domain::schema::SchemaVersion;
use std::time::Duration;
use thiserror::Error;

/// Failures raised while tagging or resolving polymorphic payloads.
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("variant {variant} of {family} is not registered for schema {schema}")]
    UnknownVariant {
        family: &'static str,
        schema: SchemaVersion,
        variant: String,
    },
    #[error("tag `{tag}` is not registered for {family} schema {schema}")]
    UnknownTag {
        family: &'static str,
        schema: SchemaVersion,
        tag: String,
    },
    /// A producer wrote a tag this consumer does not know. Callers may skip,
    /// log or quarantine the record.
    #[error("unresolved {family} variant `{tag}` for schema {schema}")]
    UnresolvedVariant {
        family: &'static str,
        schema: SchemaVersion,
        tag: String,
    },
    #[error("missing discriminator field `{field}` in {family} payload")]
    MissingDiscriminator {
        family: &'static str,
        field: &'static str,
    },
    #[error("discriminator field `{field}` in {family} payload must be a string, found {found}")]
    InvalidDiscriminator {
        family: &'static str,
        field: &'static str,
        found: String,
    },
    #[error("{family} has no registry for schema {schema}")]
    UnsupportedSchema {
        family: &'static str,
        schema: SchemaVersion,
    },
    #[error("{family} payload must be a JSON object")]
    NotAnObject { family: &'static str },
    #[error("tag `{tag}` registered twice in {family} schema {schema}")]
    DuplicateTag {
        family: &'static str,
        schema: SchemaVersion,
        tag: &'static str,
    },
    #[error("variant {variant} registered twice in {family} schema {schema}")]
    DuplicateVariant {
        family: &'static str,
        schema: SchemaVersion,
        variant: String,
    },
    #[error("{family} already has a registry for schema {schema}")]
    DuplicateSchema {
        family: &'static str,
        schema: SchemaVersion,
    },
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CodecError {
    /// Whether the record can be skipped and processing continued.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, CodecError::UnresolvedVariant { .. })
    }
}

/// Failures raised by the ephemeral store and its backends.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Transient backend failure, propagated for the caller to retry.
    #[error("backend unavailable: {0}")]
    Unavailable(#[source] Box<dyn std::error::Error + Send + Sync>),
    /// Stored bytes the backend cannot interpret. Retrying will not help.
    #[error("corrupt entry: {0}")]
    Corrupt(String),
    #[error("invalid TTL {0:?}: must be at least one second")]
    InvalidTtl(Duration),
    #[error("invalid settings: {0}")]
    InvalidSettings(String),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[cfg(feature = "storage-rocksdb")]
    #[error("RocksDB error: {0}")]
    RocksDb(#[from] rocksdb::Error),
}

impl StoreError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        StoreError::Unavailable(Box::new(std::io::Error::other(message.into())))
    }
}

/// Failures raised by the exclusive lock primitive.
#[derive(Error, Debug)]
pub enum LockError {
    #[error(
        "`{holder}` does not own lock `{resource}` (current holder: {})",
        current_holder.as_deref().unwrap_or("none")
    )]
    NotOwner {
        resource: String,
        holder: String,
        current_holder: Option<String>,
    },
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Validation failures for document constructors.
#[derive(Error, Debug, PartialEq)]
pub enum DocumentError {
    #[error(
        "invalid transaction id `{0}`: transaction id must be 32 chars long (UUID with trimmed dashes)"
    )]
    InvalidTransactionId(String),
}

pub type CodecResult<T> = std::result::Result<T, CodecError>;
pub type StoreResult<T> = std::result::Result<T, StoreError>;
pub type LockResult<T> = std::result::Result<T, LockError>;
