//! Concrete payment documents and their variant families.

pub mod events;
pub mod gateway;
pub mod queue;

use crate::error::CodecResult;
use crate::serialization::resolver::DiscriminatorResolver;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;

/// Builds a family's static resolution table.
///
/// Registrations are compiled-in constants, so a failure here is a
/// programming error surfaced at first use of the family.
pub(crate) fn static_resolver<V>(
    build: impl FnOnce() -> CodecResult<DiscriminatorResolver<V>>,
) -> Arc<DiscriminatorResolver<V>>
where
    V: Copy + Eq + Hash + Debug,
{
    match build() {
        Ok(resolver) => Arc::new(resolver),
        Err(e) => panic!("invalid static variant registration: {e}"),
    }
}
