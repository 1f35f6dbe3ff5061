//! Queue message envelope: a polymorphic event plus W3C trace context.

use crate::domain::schema::{Polymorphic, SchemaVersion};
use crate::error::CodecResult;
use crate::serialization::codec::PolymorphicCodec;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TracingInfo {
    pub traceparent: String,
    pub tracestate: String,
    pub baggage: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueueEvent<P> {
    pub event: P,
    pub tracing_info: TracingInfo,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawQueueEvent {
    event: Value,
    tracing_info: TracingInfo,
}

/// Writes `{"event": <tagged event>, "tracingInfo": {...}}` messages.
pub struct QueueEventCodec<P: Polymorphic> {
    codec: PolymorphicCodec<P>,
}

impl<P: Polymorphic> QueueEventCodec<P> {
    pub fn new(schema: SchemaVersion) -> Self {
        Self {
            codec: PolymorphicCodec::new(schema),
        }
    }

    pub fn encode(&self, message: &QueueEvent<P>) -> CodecResult<Vec<u8>> {
        let mut envelope = Map::with_capacity(2);
        envelope.insert("event".to_string(), self.codec.encode_value(&message.event)?);
        envelope.insert(
            "tracingInfo".to_string(),
            serde_json::to_value(&message.tracing_info)?,
        );
        Ok(serde_json::to_vec(&Value::Object(envelope))?)
    }

    pub fn decode(&self, bytes: &[u8], expected: SchemaVersion) -> CodecResult<QueueEvent<P>> {
        let raw: RawQueueEvent = serde_json::from_slice(bytes)?;
        Ok(QueueEvent {
            event: self.codec.decode_value(raw.event, expected)?,
            tracing_info: raw.tracing_info,
        })
    }
}
