//! Polymorphic JSON (de)serialization: per-version type registries, the
//! discriminator resolution table and the codec built on them.

pub mod codec;
pub mod nested;
pub mod registry;
pub mod resolver;

pub use codec::PolymorphicCodec;
pub use registry::{Convention, DiscriminatorField, TypeRegistry, VariantDescriptor};
pub use resolver::DiscriminatorResolver;
