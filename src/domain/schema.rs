use crate::serialization::resolver::DiscriminatorResolver;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::hash::Hash;
use std::str::FromStr;
use std::sync::Arc;

/// Ordinal partitioning the tag namespaces of a variant family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaVersion {
    V1,
    V2,
}

impl SchemaVersion {
    pub const ALL: [SchemaVersion; 2] = [SchemaVersion::V1, SchemaVersion::V2];
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaVersion::V1 => f.write_str("v1"),
            SchemaVersion::V2 => f.write_str("v2"),
        }
    }
}

impl FromStr for SchemaVersion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "v1" | "1" => Ok(SchemaVersion::V1),
            "v2" | "2" => Ok(SchemaVersion::V2),
            other => Err(format!("unknown schema version `{other}`")),
        }
    }
}

/// A closed set of payload shapes sharing one wire discriminator.
///
/// Implementors are enums whose variants carry the concrete payload structs.
/// `variant` and `from_payload` are exhaustive matches, so a new variant does
/// not compile until it is mapped, and the family's registries reject it at
/// first use until it is given a tag.
pub trait Polymorphic: Sized {
    /// Field-less mirror of the family's variants.
    type Variant: Copy + Eq + Hash + fmt::Debug + Send + Sync + 'static;

    /// Family name used in errors and logs.
    const FAMILY: &'static str;

    /// Schema used when the family is embedded inside another document.
    const NESTED_SCHEMA: SchemaVersion;

    fn variant(&self) -> Self::Variant;

    /// Static per-version resolution table for this family.
    fn resolver() -> Arc<DiscriminatorResolver<Self::Variant>>;

    /// The payload's own fields, without any discriminator.
    fn to_payload(&self) -> serde_json::Result<Value>;

    fn from_payload(variant: Self::Variant, payload: Value) -> serde_json::Result<Self>;
}
