use crate::domain::schema::SchemaVersion;
use crate::error::{CodecError, CodecResult};
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

/// How the discriminator relates to the payload's own fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Convention {
    /// The tag is a regular business field of the payload (e.g. `eventCode`)
    /// and stays visible to the payload after decoding.
    BusinessField,
    /// The tag is a structural marker (e.g. `_class`) stripped before the
    /// payload is deserialized.
    Structural,
}

/// Wire field carrying the tag, plus its convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiscriminatorField {
    pub name: &'static str,
    pub convention: Convention,
}

impl DiscriminatorField {
    pub const fn business(name: &'static str) -> Self {
        Self {
            name,
            convention: Convention::BusinessField,
        }
    }

    pub const fn structural(name: &'static str) -> Self {
        Self {
            name,
            convention: Convention::Structural,
        }
    }
}

/// A resolved tag: which variant it names and in which namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VariantDescriptor<V> {
    pub variant: V,
    pub tag: &'static str,
    pub schema: SchemaVersion,
}

/// Bidirectional variant <-> tag table for one (schema version, field) pair.
///
/// Immutable once built; lookups never cross into another registry, so two
/// registries may reuse a tag string for unrelated variants.
#[derive(Debug)]
pub struct TypeRegistry<V> {
    family: &'static str,
    schema: SchemaVersion,
    field: DiscriminatorField,
    by_variant: HashMap<V, &'static str>,
    by_tag: HashMap<&'static str, V>,
}

impl<V> TypeRegistry<V>
where
    V: Copy + Eq + Hash + Debug,
{
    pub fn builder(
        family: &'static str,
        schema: SchemaVersion,
        field: DiscriminatorField,
    ) -> RegistryBuilder<V> {
        RegistryBuilder {
            family,
            schema,
            field,
            entries: Vec::new(),
        }
    }

    pub fn family(&self) -> &'static str {
        self.family
    }

    pub fn schema(&self) -> SchemaVersion {
        self.schema
    }

    pub fn field(&self) -> DiscriminatorField {
        self.field
    }

    pub fn len(&self) -> usize {
        self.by_tag.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_tag.is_empty()
    }

    pub fn contains_tag(&self, tag: &str) -> bool {
        self.by_tag.contains_key(tag)
    }

    /// Registered tags in no particular order.
    pub fn tags(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.by_tag.keys().copied()
    }

    pub fn tag_of(&self, variant: V) -> CodecResult<&'static str> {
        self.by_variant
            .get(&variant)
            .copied()
            .ok_or_else(|| CodecError::UnknownVariant {
                family: self.family,
                schema: self.schema,
                variant: format!("{variant:?}"),
            })
    }

    pub fn type_of(&self, tag: &str) -> CodecResult<VariantDescriptor<V>> {
        self.by_tag
            .get_key_value(tag)
            .map(|(registered, variant)| VariantDescriptor {
                variant: *variant,
                tag: *registered,
                schema: self.schema,
            })
            .ok_or_else(|| CodecError::UnknownTag {
                family: self.family,
                schema: self.schema,
                tag: tag.to_string(),
            })
    }
}

/// Collects registrations and validates them in [`RegistryBuilder::build`].
pub struct RegistryBuilder<V> {
    family: &'static str,
    schema: SchemaVersion,
    field: DiscriminatorField,
    entries: Vec<(V, &'static str)>,
}

impl<V> RegistryBuilder<V>
where
    V: Copy + Eq + Hash + Debug,
{
    pub fn register(mut self, variant: V, tag: &'static str) -> Self {
        self.entries.push((variant, tag));
        self
    }

    /// Registers every variant for which `tag_of` yields a tag.
    ///
    /// Pair with an exhaustive `match` so adding a variant to the family
    /// forces a decision for each schema version.
    pub fn register_all(
        mut self,
        variants: &[V],
        tag_of: impl Fn(V) -> Option<&'static str>,
    ) -> Self {
        for &variant in variants {
            if let Some(tag) = tag_of(variant) {
                self.entries.push((variant, tag));
            }
        }
        self
    }

    pub fn build(self) -> CodecResult<TypeRegistry<V>> {
        let mut by_variant = HashMap::with_capacity(self.entries.len());
        let mut by_tag = HashMap::with_capacity(self.entries.len());

        for (variant, tag) in self.entries {
            if by_tag.insert(tag, variant).is_some() {
                return Err(CodecError::DuplicateTag {
                    family: self.family,
                    schema: self.schema,
                    tag,
                });
            }
            if by_variant.insert(variant, tag).is_some() {
                return Err(CodecError::DuplicateVariant {
                    family: self.family,
                    schema: self.schema,
                    variant: format!("{variant:?}"),
                });
            }
        }

        tracing::debug!(
            family = self.family,
            schema = %self.schema,
            field = self.field.name,
            variants = by_tag.len(),
            "Type registry built"
        );

        Ok(TypeRegistry {
            family: self.family,
            schema: self.schema,
            field: self.field,
            by_variant,
            by_tag,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum Shape {
        Circle,
        Square,
        Triangle,
    }

    fn registry() -> TypeRegistry<Shape> {
        TypeRegistry::builder("Shape", SchemaVersion::V1, DiscriminatorField::structural("type"))
            .register(Shape::Circle, "CIRCLE")
            .register(Shape::Square, "SQUARE")
            .build()
            .unwrap()
    }

    #[test]
    fn test_tag_lookup_both_ways() {
        let registry = registry();
        assert_eq!(registry.tag_of(Shape::Circle).unwrap(), "CIRCLE");

        let descriptor = registry.type_of("SQUARE").unwrap();
        assert_eq!(descriptor.variant, Shape::Square);
        assert_eq!(descriptor.tag, "SQUARE");
        assert_eq!(descriptor.schema, SchemaVersion::V1);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_unregistered_variant_is_unknown_variant() {
        let err = registry().tag_of(Shape::Triangle).unwrap_err();
        assert!(matches!(err, CodecError::UnknownVariant { .. }));
    }

    #[test]
    fn test_absent_tag_is_unknown_tag() {
        let err = registry().type_of("HEXAGON").unwrap_err();
        assert!(matches!(err, CodecError::UnknownTag { ref tag, .. } if tag == "HEXAGON"));
        // Lookups are case sensitive.
        assert!(registry().type_of("circle").is_err());
    }

    #[test]
    fn test_duplicate_tag_rejected_at_build() {
        let result = TypeRegistry::builder(
            "Shape",
            SchemaVersion::V1,
            DiscriminatorField::structural("type"),
        )
        .register(Shape::Circle, "ROUND")
        .register(Shape::Square, "ROUND")
        .build();
        assert!(matches!(result, Err(CodecError::DuplicateTag { tag: "ROUND", .. })));
    }

    #[test]
    fn test_duplicate_variant_rejected_at_build() {
        let result = TypeRegistry::builder(
            "Shape",
            SchemaVersion::V1,
            DiscriminatorField::structural("type"),
        )
        .register(Shape::Circle, "CIRCLE")
        .register(Shape::Circle, "ROUND")
        .build();
        assert!(matches!(result, Err(CodecError::DuplicateVariant { .. })));
    }

    #[test]
    fn test_same_tag_in_separate_registries() {
        let v1 = registry();
        let v2 = TypeRegistry::builder(
            "Shape",
            SchemaVersion::V2,
            DiscriminatorField::structural("_class"),
        )
        .register(Shape::Triangle, "CIRCLE")
        .build()
        .unwrap();

        assert_eq!(v1.type_of("CIRCLE").unwrap().variant, Shape::Circle);
        assert_eq!(v2.type_of("CIRCLE").unwrap().variant, Shape::Triangle);
    }

    #[test]
    fn test_register_all_skips_unmapped_variants() {
        let registry = TypeRegistry::builder(
            "Shape",
            SchemaVersion::V2,
            DiscriminatorField::business("kind"),
        )
        .register_all(&[Shape::Circle, Shape::Square, Shape::Triangle], |shape| match shape {
            Shape::Circle => Some("C"),
            Shape::Square => None,
            Shape::Triangle => Some("T"),
        })
        .build()
        .unwrap();

        assert_eq!(registry.len(), 2);
        assert!(registry.contains_tag("T"));
        assert!(registry.tag_of(Shape::Square).is_err());
    }
}
