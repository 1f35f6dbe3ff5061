//! Shared data contracts and storage primitives for the payment transaction
//! platform: versioned polymorphic documents and a TTL-backed keyed store
//! with a lease-based exclusive lock on top.

pub mod application;
pub mod config;
pub mod documents;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod interfaces;
pub mod serialization;
pub mod telemetry;
