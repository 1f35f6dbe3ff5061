//! Payment-gateway specific data attached to transaction events.

use super::static_resolver;
use crate::domain::schema::{Polymorphic, SchemaVersion};
use crate::serialization::registry::{DiscriminatorField, TypeRegistry};
use crate::serialization::resolver::DiscriminatorResolver;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;

// ============================================================================
// Activation data
// ============================================================================

/// NPG order data captured when the transaction is activated.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NpgActivationData {
    pub order_id: String,
    pub correlation_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayActivationData {
    /// No gateway information available for the transaction.
    Empty,
    Npg(NpgActivationData),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActivationDataType {
    Empty,
    Npg,
}

impl ActivationDataType {
    pub const ALL: [ActivationDataType; 2] = [ActivationDataType::Empty, ActivationDataType::Npg];

    fn v2_tag(self) -> Option<&'static str> {
        match self {
            ActivationDataType::Empty => Some("EMPTY"),
            ActivationDataType::Npg => Some("NPG"),
        }
    }
}

static ACTIVATION_RESOLVER: Lazy<Arc<DiscriminatorResolver<ActivationDataType>>> =
    Lazy::new(|| {
        static_resolver(|| {
            DiscriminatorResolver::new(GatewayActivationData::FAMILY).with_registry(
                TypeRegistry::builder(
                    GatewayActivationData::FAMILY,
                    SchemaVersion::V2,
                    DiscriminatorField::structural("_class"),
                )
                .register_all(&ActivationDataType::ALL, ActivationDataType::v2_tag)
                .build()?,
            )
        })
    });

impl Polymorphic for GatewayActivationData {
    type Variant = ActivationDataType;

    const FAMILY: &'static str = "TransactionGatewayActivationData";
    const NESTED_SCHEMA: SchemaVersion = SchemaVersion::V2;

    fn variant(&self) -> ActivationDataType {
        match self {
            GatewayActivationData::Empty => ActivationDataType::Empty,
            GatewayActivationData::Npg(_) => ActivationDataType::Npg,
        }
    }

    fn resolver() -> Arc<DiscriminatorResolver<ActivationDataType>> {
        Arc::clone(&ACTIVATION_RESOLVER)
    }

    fn to_payload(&self) -> serde_json::Result<Value> {
        match self {
            GatewayActivationData::Empty => Ok(json!({})),
            GatewayActivationData::Npg(data) => serde_json::to_value(data),
        }
    }

    fn from_payload(variant: ActivationDataType, payload: Value) -> serde_json::Result<Self> {
        match variant {
            ActivationDataType::Empty => Ok(GatewayActivationData::Empty),
            ActivationDataType::Npg => {
                serde_json::from_value(payload).map(GatewayActivationData::Npg)
            }
        }
    }
}

// ============================================================================
// Authorization requested data
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CardBrand {
    Visa,
    Mastercard,
    Unknown,
    Diners,
    Maestro,
    Amex,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PgsAuthorizationRequestedData {
    pub logo: String,
    #[serde(default)]
    pub brand: Option<CardBrand>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NpgAuthorizationRequestedData {
    pub logo: String,
    pub brand: String,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub confirm_payment_session_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedirectAuthorizationRequestedData {
    pub logo: String,
    /// How long the backend waits for the PSP outcome.
    pub transaction_outcome_timeout_millis: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayAuthorizationRequestedData {
    Pgs(PgsAuthorizationRequestedData),
    Npg(NpgAuthorizationRequestedData),
    Redirect(RedirectAuthorizationRequestedData),
    Empty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthorizationDataType {
    Pgs,
    Npg,
    Redirect,
    Empty,
}

impl AuthorizationDataType {
    pub const ALL: [AuthorizationDataType; 4] = [
        AuthorizationDataType::Pgs,
        AuthorizationDataType::Npg,
        AuthorizationDataType::Redirect,
        AuthorizationDataType::Empty,
    ];

    /// Legacy gateways only.
    fn v1_tag(self) -> Option<&'static str> {
        match self {
            AuthorizationDataType::Pgs => Some("PGS"),
            AuthorizationDataType::Npg => Some("NPG"),
            AuthorizationDataType::Redirect | AuthorizationDataType::Empty => None,
        }
    }

    fn v2_tag(self) -> Option<&'static str> {
        match self {
            AuthorizationDataType::Pgs => Some("PGS"),
            AuthorizationDataType::Npg => Some("NPG"),
            AuthorizationDataType::Redirect => Some("REDIRECT"),
            AuthorizationDataType::Empty => Some("EMPTY"),
        }
    }
}

static AUTHORIZATION_REQUESTED_RESOLVER: Lazy<
    Arc<DiscriminatorResolver<AuthorizationDataType>>,
> = Lazy::new(|| {
    static_resolver(|| {
        let family = GatewayAuthorizationRequestedData::FAMILY;
        DiscriminatorResolver::new(family)
            .with_registry(
                TypeRegistry::builder(
                    family,
                    SchemaVersion::V1,
                    DiscriminatorField::structural("type"),
                )
                .register_all(&AuthorizationDataType::ALL, AuthorizationDataType::v1_tag)
                .build()?,
            )?
            .with_registry(
                TypeRegistry::builder(
                    family,
                    SchemaVersion::V2,
                    DiscriminatorField::structural("_class"),
                )
                .register_all(&AuthorizationDataType::ALL, AuthorizationDataType::v2_tag)
                .build()?,
            )
    })
});

impl Polymorphic for GatewayAuthorizationRequestedData {
    type Variant = AuthorizationDataType;

    const FAMILY: &'static str = "TransactionGatewayAuthorizationRequestedData";
    const NESTED_SCHEMA: SchemaVersion = SchemaVersion::V2;

    fn variant(&self) -> AuthorizationDataType {
        match self {
            GatewayAuthorizationRequestedData::Pgs(_) => AuthorizationDataType::Pgs,
            GatewayAuthorizationRequestedData::Npg(_) => AuthorizationDataType::Npg,
            GatewayAuthorizationRequestedData::Redirect(_) => AuthorizationDataType::Redirect,
            GatewayAuthorizationRequestedData::Empty => AuthorizationDataType::Empty,
        }
    }

    fn resolver() -> Arc<DiscriminatorResolver<AuthorizationDataType>> {
        Arc::clone(&AUTHORIZATION_REQUESTED_RESOLVER)
    }

    fn to_payload(&self) -> serde_json::Result<Value> {
        match self {
            GatewayAuthorizationRequestedData::Pgs(data) => serde_json::to_value(data),
            GatewayAuthorizationRequestedData::Npg(data) => serde_json::to_value(data),
            GatewayAuthorizationRequestedData::Redirect(data) => serde_json::to_value(data),
            GatewayAuthorizationRequestedData::Empty => Ok(json!({})),
        }
    }

    fn from_payload(variant: AuthorizationDataType, payload: Value) -> serde_json::Result<Self> {
        match variant {
            AuthorizationDataType::Pgs => {
                serde_json::from_value(payload).map(GatewayAuthorizationRequestedData::Pgs)
            }
            AuthorizationDataType::Npg => {
                serde_json::from_value(payload).map(GatewayAuthorizationRequestedData::Npg)
            }
            AuthorizationDataType::Redirect => {
                serde_json::from_value(payload).map(GatewayAuthorizationRequestedData::Redirect)
            }
            AuthorizationDataType::Empty => Ok(GatewayAuthorizationRequestedData::Empty),
        }
    }
}
