//! Application layer: the keyspace-scoped ephemeral store and the lease-based
//! exclusive lock built on it. Both come in a blocking and a non-blocking
//! flavour over the backend ports.

pub mod lock;
pub mod store;
