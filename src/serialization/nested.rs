//! Serde adapters for polymorphic fields embedded in other documents.
//!
//! The embedded value is tagged with its family's nested schema:
//!
//! ```ignore
//! #[serde(with = "crate::serialization::nested::option")]
//! pub transaction_gateway_activation_data: Option<GatewayActivationData>,
//! ```

use crate::domain::schema::Polymorphic;
use crate::serialization::codec::PolymorphicCodec;
use serde::de::Error as _;
use serde::ser::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

pub fn serialize<P, S>(value: &P, serializer: S) -> Result<S::Ok, S::Error>
where
    P: Polymorphic,
    S: Serializer,
{
    PolymorphicCodec::<P>::new(P::NESTED_SCHEMA)
        .encode_value(value)
        .map_err(S::Error::custom)?
        .serialize(serializer)
}

pub fn deserialize<'de, P, D>(deserializer: D) -> Result<P, D::Error>
where
    P: Polymorphic,
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    PolymorphicCodec::<P>::new(P::NESTED_SCHEMA)
        .decode_value(value, P::NESTED_SCHEMA)
        .map_err(D::Error::custom)
}

pub mod option {
    use crate::domain::schema::Polymorphic;
    use crate::serialization::codec::PolymorphicCodec;
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};
    use serde_json::Value;

    pub fn serialize<P, S>(value: &Option<P>, serializer: S) -> Result<S::Ok, S::Error>
    where
        P: Polymorphic,
        S: Serializer,
    {
        match value {
            Some(inner) => super::serialize(inner, serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, P, D>(deserializer: D) -> Result<Option<P>, D::Error>
    where
        P: Polymorphic,
        D: Deserializer<'de>,
    {
        match Option::<Value>::deserialize(deserializer)? {
            Some(value) => PolymorphicCodec::<P>::new(P::NESTED_SCHEMA)
                .decode_value(value, P::NESTED_SCHEMA)
                .map(Some)
                .map_err(D::Error::custom),
            None => Ok(None),
        }
    }
}
