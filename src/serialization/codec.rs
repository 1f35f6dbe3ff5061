use crate::domain::schema::{Polymorphic, SchemaVersion};
use crate::error::{CodecError, CodecResult};
use crate::serialization::registry::{Convention, VariantDescriptor};
use crate::serialization::resolver::DiscriminatorResolver;
use serde_json::{Map, Value};
use std::marker::PhantomData;
use std::sync::Arc;

/// Encodes and decodes one variant family as flat JSON objects carrying a
/// single discriminator field.
///
/// Encoding always uses the codec's configured schema; decoding takes the
/// expected schema per call so a consumer can read legacy and current
/// streams with the same codec.
pub struct PolymorphicCodec<P: Polymorphic> {
    resolver: Arc<DiscriminatorResolver<P::Variant>>,
    schema: SchemaVersion,
    _family: PhantomData<fn() -> P>,
}

impl<P: Polymorphic> Clone for PolymorphicCodec<P> {
    fn clone(&self) -> Self {
        Self {
            resolver: Arc::clone(&self.resolver),
            schema: self.schema,
            _family: PhantomData,
        }
    }
}

impl<P: Polymorphic> PolymorphicCodec<P> {
    /// Codec over the family's own resolution table.
    pub fn new(schema: SchemaVersion) -> Self {
        Self::with_resolver(P::resolver(), schema)
    }

    pub fn with_resolver(
        resolver: Arc<DiscriminatorResolver<P::Variant>>,
        schema: SchemaVersion,
    ) -> Self {
        Self {
            resolver,
            schema,
            _family: PhantomData,
        }
    }

    pub fn schema(&self) -> SchemaVersion {
        self.schema
    }

    /// Tag the value is written with under the configured schema.
    pub fn tag_of(&self, value: &P) -> CodecResult<&'static str> {
        let (_, registry) = self.resolver.resolve_for_encode(self.schema)?;
        registry.tag_of(value.variant())
    }

    /// Writes the discriminator first, then every payload field except one
    /// sharing the discriminator's name, so the registry tag always wins.
    pub fn encode_value(&self, value: &P) -> CodecResult<Value> {
        let (field, registry) = self.resolver.resolve_for_encode(self.schema)?;
        let tag = registry.tag_of(value.variant())?;

        let Value::Object(payload) = value.to_payload()? else {
            return Err(CodecError::NotAnObject { family: P::FAMILY });
        };

        let mut fields = Map::with_capacity(payload.len() + 1);
        fields.insert(field.name.to_string(), Value::String(tag.to_string()));
        fields.extend(payload.into_iter().filter(|(name, _)| name != field.name));

        Ok(Value::Object(fields))
    }

    pub fn encode(&self, value: &P) -> CodecResult<Vec<u8>> {
        let encoded = self.encode_value(value)?;
        Ok(serde_json::to_vec(&encoded)?)
    }

    pub fn decode_value(&self, value: Value, expected: SchemaVersion) -> CodecResult<P> {
        self.decode_value_with_descriptor(value, expected)
            .map(|(_, decoded)| decoded)
    }

    pub fn decode(&self, bytes: &[u8], expected: SchemaVersion) -> CodecResult<P> {
        self.decode_with_descriptor(bytes, expected)
            .map(|(_, decoded)| decoded)
    }

    /// Decodes and also returns the descriptor the tag resolved to.
    pub fn decode_with_descriptor(
        &self,
        bytes: &[u8],
        expected: SchemaVersion,
    ) -> CodecResult<(VariantDescriptor<P::Variant>, P)> {
        let value: Value = serde_json::from_slice(bytes)?;
        self.decode_value_with_descriptor(value, expected)
    }

    fn decode_value_with_descriptor(
        &self,
        value: Value,
        expected: SchemaVersion,
    ) -> CodecResult<(VariantDescriptor<P::Variant>, P)> {
        let Value::Object(mut fields) = value else {
            return Err(CodecError::NotAnObject { family: P::FAMILY });
        };

        let field = self.resolver.registry(expected)?.field();
        let descriptor = self
            .resolver
            .resolve_for_decode(expected, fields.get(field.name))?;

        if field.convention == Convention::Structural {
            fields.remove(field.name);
        }

        tracing::debug!(
            family = P::FAMILY,
            schema = %expected,
            tag = descriptor.tag,
            "Decoding polymorphic payload"
        );

        let decoded = P::from_payload(descriptor.variant, Value::Object(fields))?;
        Ok((descriptor, decoded))
    }
}
