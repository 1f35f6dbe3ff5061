//! Domain layer: schema versions, the variant family contract, keyed records
//! and the backend ports the storage layer is written against.

pub mod ports;
pub mod records;
pub mod schema;
