use crate::domain::schema::SchemaVersion;
use crate::error::{CodecError, CodecResult};
use crate::serialization::registry::{DiscriminatorField, TypeRegistry, VariantDescriptor};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::hash::Hash;

/// Strategy table selecting, per schema version, the discriminator field and
/// the registry that resolves it.
///
/// Legacy (business field) and current (structural) conventions coexist here
/// as plain table entries, which is what lets producers and consumers on
/// different releases share one stream during a rolling deploy.
#[derive(Debug)]
pub struct DiscriminatorResolver<V> {
    family: &'static str,
    registries: BTreeMap<SchemaVersion, TypeRegistry<V>>,
}

impl<V> DiscriminatorResolver<V>
where
    V: Copy + Eq + Hash + Debug,
{
    pub fn new(family: &'static str) -> Self {
        Self {
            family,
            registries: BTreeMap::new(),
        }
    }

    /// Adds the registry for its schema version. Each version may be
    /// registered once.
    pub fn with_registry(mut self, registry: TypeRegistry<V>) -> CodecResult<Self> {
        let schema = registry.schema();
        if self.registries.contains_key(&schema) {
            return Err(CodecError::DuplicateSchema {
                family: self.family,
                schema,
            });
        }
        self.registries.insert(schema, registry);
        Ok(self)
    }

    pub fn family(&self) -> &'static str {
        self.family
    }

    pub fn schemas(&self) -> impl Iterator<Item = SchemaVersion> + '_ {
        self.registries.keys().copied()
    }

    pub fn registry(&self, schema: SchemaVersion) -> CodecResult<&TypeRegistry<V>> {
        self.registries
            .get(&schema)
            .ok_or(CodecError::UnsupportedSchema {
                family: self.family,
                schema,
            })
    }

    pub fn resolve_for_encode(
        &self,
        schema: SchemaVersion,
    ) -> CodecResult<(DiscriminatorField, &TypeRegistry<V>)> {
        let registry = self.registry(schema)?;
        Ok((registry.field(), registry))
    }

    /// Resolves the raw discriminator value read from a payload.
    ///
    /// A string tag unknown to `schema` yields the recoverable
    /// [`CodecError::UnresolvedVariant`], even when another version knows it.
    pub fn resolve_for_decode(
        &self,
        schema: SchemaVersion,
        raw: Option<&Value>,
    ) -> CodecResult<VariantDescriptor<V>> {
        let registry = self.registry(schema)?;
        let field = registry.field();

        let tag = match raw {
            None | Some(Value::Null) => {
                return Err(CodecError::MissingDiscriminator {
                    family: self.family,
                    field: field.name,
                });
            }
            Some(Value::String(tag)) => tag.as_str(),
            Some(other) => {
                return Err(CodecError::InvalidDiscriminator {
                    family: self.family,
                    field: field.name,
                    found: other.to_string(),
                });
            }
        };

        registry.type_of(tag).map_err(|_| {
            let known_in = self
                .registries
                .values()
                .find(|other| other.schema() != schema && other.contains_tag(tag))
                .map(|other| other.schema());
            tracing::warn!(
                family = self.family,
                schema = %schema,
                tag,
                known_in = ?known_in,
                "Unresolved variant tag"
            );
            CodecError::UnresolvedVariant {
                family: self.family,
                schema,
                tag: tag.to_string(),
            }
        })
    }
}
