//! Transaction event store documents.
//!
//! Legacy (v1) events are discriminated by their `eventCode` business field.
//! Current (v2) events carry a structural `_class` marker and still write
//! `eventCode` as a plain field.

use super::gateway::{GatewayActivationData, GatewayAuthorizationRequestedData};
use super::static_resolver;
use crate::domain::schema::{Polymorphic, SchemaVersion};
use crate::error::DocumentError;
use crate::serialization::nested;
use crate::serialization::registry::{DiscriminatorField, TypeRegistry};
use crate::serialization::resolver::DiscriminatorResolver;
use chrono::{SecondsFormat, Utc};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

const TRANSACTION_ID_LENGTH: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionEventCode {
    TransactionActivatedEvent,
    TransactionAuthorizationRequestedEvent,
    TransactionAuthorizationOutcomeWaitingEvent,
    TransactionAuthorizationCompletedEvent,
    TransactionClosureRequestedEvent,
    TransactionClosedEvent,
    TransactionExpiredEvent,
    TransactionUserCanceledEvent,
    TransactionRefundedEvent,
}

impl TransactionEventCode {
    pub const ALL: [TransactionEventCode; 9] = [
        TransactionEventCode::TransactionActivatedEvent,
        TransactionEventCode::TransactionAuthorizationRequestedEvent,
        TransactionEventCode::TransactionAuthorizationOutcomeWaitingEvent,
        TransactionEventCode::TransactionAuthorizationCompletedEvent,
        TransactionEventCode::TransactionClosureRequestedEvent,
        TransactionEventCode::TransactionClosedEvent,
        TransactionEventCode::TransactionExpiredEvent,
        TransactionEventCode::TransactionUserCanceledEvent,
        TransactionEventCode::TransactionRefundedEvent,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TransactionEventCode::TransactionActivatedEvent => "TRANSACTION_ACTIVATED_EVENT",
            TransactionEventCode::TransactionAuthorizationRequestedEvent => {
                "TRANSACTION_AUTHORIZATION_REQUESTED_EVENT"
            }
            TransactionEventCode::TransactionAuthorizationOutcomeWaitingEvent => {
                "TRANSACTION_AUTHORIZATION_OUTCOME_WAITING_EVENT"
            }
            TransactionEventCode::TransactionAuthorizationCompletedEvent => {
                "TRANSACTION_AUTHORIZATION_COMPLETED_EVENT"
            }
            TransactionEventCode::TransactionClosureRequestedEvent => {
                "TRANSACTION_CLOSURE_REQUESTED_EVENT"
            }
            TransactionEventCode::TransactionClosedEvent => "TRANSACTION_CLOSED_EVENT",
            TransactionEventCode::TransactionExpiredEvent => "TRANSACTION_EXPIRED_EVENT",
            TransactionEventCode::TransactionUserCanceledEvent => "TRANSACTION_USER_CANCELED_EVENT",
            TransactionEventCode::TransactionRefundedEvent => "TRANSACTION_REFUNDED_EVENT",
        }
    }

    /// Legacy tags are the event codes themselves. Outcome-waiting and
    /// closure-requested events did not exist before v2.
    fn v1_tag(self) -> Option<&'static str> {
        match self {
            TransactionEventCode::TransactionActivatedEvent
            | TransactionEventCode::TransactionAuthorizationRequestedEvent
            | TransactionEventCode::TransactionAuthorizationCompletedEvent
            | TransactionEventCode::TransactionClosedEvent
            | TransactionEventCode::TransactionExpiredEvent
            | TransactionEventCode::TransactionUserCanceledEvent
            | TransactionEventCode::TransactionRefundedEvent => Some(self.as_str()),
            TransactionEventCode::TransactionAuthorizationOutcomeWaitingEvent
            | TransactionEventCode::TransactionClosureRequestedEvent => None,
        }
    }

    fn v2_tag(self) -> Option<&'static str> {
        Some(match self {
            TransactionEventCode::TransactionActivatedEvent => {
                "transactions.v2.TransactionActivatedEvent"
            }
            TransactionEventCode::TransactionAuthorizationRequestedEvent => {
                "transactions.v2.TransactionAuthorizationRequestedEvent"
            }
            TransactionEventCode::TransactionAuthorizationOutcomeWaitingEvent => {
                "transactions.v2.TransactionAuthorizationOutcomeWaitingEvent"
            }
            TransactionEventCode::TransactionAuthorizationCompletedEvent => {
                "transactions.v2.TransactionAuthorizationCompletedEvent"
            }
            TransactionEventCode::TransactionClosureRequestedEvent => {
                "transactions.v2.TransactionClosureRequestedEvent"
            }
            TransactionEventCode::TransactionClosedEvent => {
                "transactions.v2.TransactionClosedEvent"
            }
            TransactionEventCode::TransactionExpiredEvent => {
                "transactions.v2.TransactionExpiredEvent"
            }
            TransactionEventCode::TransactionUserCanceledEvent => {
                "transactions.v2.TransactionUserCanceledEvent"
            }
            TransactionEventCode::TransactionRefundedEvent => {
                "transactions.v2.TransactionRefundedEvent"
            }
        })
    }
}

/// Common event store envelope. The event code is implied by the
/// [`TransactionEvent`] variant wrapping it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event<T> {
    pub id: String,
    pub transaction_id: String,
    pub creation_date: String,
    pub data: T,
}

impl<T> Event<T> {
    /// Creates an event with a fresh id, stamped with the current time.
    ///
    /// Transaction ids are UUIDs with the dashes trimmed, 32 chars long.
    pub fn new(transaction_id: impl Into<String>, data: T) -> Result<Self, DocumentError> {
        let transaction_id = transaction_id.into();
        if transaction_id.len() != TRANSACTION_ID_LENGTH {
            return Err(DocumentError::InvalidTransactionId(transaction_id));
        }
        Ok(Self {
            id: Uuid::new_v4().to_string(),
            transaction_id,
            creation_date: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            data,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientId {
    Checkout,
    Io,
    CheckoutCart,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentNotice {
    pub payment_token: String,
    pub rpt_id: String,
    pub description: String,
    /// Euro cents.
    pub amount: i64,
    #[serde(default)]
    pub payment_context_code: Option<String>,
    #[serde(default, rename = "isAllCCP")]
    pub is_all_ccp: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionActivatedData {
    pub email: String,
    pub payment_notices: Vec<PaymentNotice>,
    #[serde(default)]
    pub fault_code: Option<String>,
    #[serde(default)]
    pub fault_code_string: Option<String>,
    pub client_id: ClientId,
    #[serde(default)]
    pub id_cart: Option<String>,
    pub payment_token_validity_seconds: u32,
    #[serde(default, with = "nested::option")]
    pub transaction_gateway_activation_data: Option<GatewayActivationData>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PaymentGateway {
    Vpos,
    Xpay,
    Npg,
    Redirect,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionAuthorizationRequestData {
    pub amount: i64,
    pub fee: i64,
    pub payment_instrument_id: String,
    pub psp_id: String,
    pub payment_type_code: String,
    pub broker_name: String,
    pub psp_channel_code: String,
    pub payment_method_name: String,
    pub psp_business_name: String,
    #[serde(default)]
    pub is_psp_on_us: bool,
    pub authorization_request_id: String,
    pub payment_gateway: PaymentGateway,
    #[serde(default)]
    pub payment_method_description: Option<String>,
    #[serde(default, with = "nested::option")]
    pub transaction_gateway_authorization_requested_data: Option<GatewayAuthorizationRequestedData>,
    #[serde(default)]
    pub id_bundle: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Outcome {
    Ok,
    Ko,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionAuthorizationCompletedData {
    #[serde(default)]
    pub authorization_code: Option<String>,
    #[serde(default)]
    pub rrn: Option<String>,
    #[serde(default)]
    pub timestamp_operation: Option<String>,
    pub outcome: Outcome,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionClosureData {
    pub response_outcome: Outcome,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionExpiredData {
    pub status_before_expiration: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRefundedData {
    pub status_before_refunded: String,
}

/// Closed set of transaction events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionEvent {
    Activated(Event<TransactionActivatedData>),
    AuthorizationRequested(Event<TransactionAuthorizationRequestData>),
    AuthorizationOutcomeWaiting(Event<()>),
    AuthorizationCompleted(Event<TransactionAuthorizationCompletedData>),
    ClosureRequested(Event<()>),
    Closed(Event<TransactionClosureData>),
    Expired(Event<TransactionExpiredData>),
    UserCanceled(Event<()>),
    Refunded(Event<TransactionRefundedData>),
}

impl TransactionEvent {
    pub fn event_code(&self) -> TransactionEventCode {
        self.variant()
    }

    pub fn transaction_id(&self) -> &str {
        match self {
            TransactionEvent::Activated(e) => &e.transaction_id,
            TransactionEvent::AuthorizationRequested(e) => &e.transaction_id,
            TransactionEvent::AuthorizationOutcomeWaiting(e) => &e.transaction_id,
            TransactionEvent::AuthorizationCompleted(e) => &e.transaction_id,
            TransactionEvent::ClosureRequested(e) => &e.transaction_id,
            TransactionEvent::Closed(e) => &e.transaction_id,
            TransactionEvent::Expired(e) => &e.transaction_id,
            TransactionEvent::UserCanceled(e) => &e.transaction_id,
            TransactionEvent::Refunded(e) => &e.transaction_id,
        }
    }
}

static EVENT_RESOLVER: Lazy<Arc<DiscriminatorResolver<TransactionEventCode>>> = Lazy::new(|| {
    static_resolver(|| {
        let family = TransactionEvent::FAMILY;
        DiscriminatorResolver::new(family)
            .with_registry(
                TypeRegistry::builder(
                    family,
                    SchemaVersion::V1,
                    DiscriminatorField::business("eventCode"),
                )
                .register_all(&TransactionEventCode::ALL, TransactionEventCode::v1_tag)
                .build()?,
            )?
            .with_registry(
                TypeRegistry::builder(
                    family,
                    SchemaVersion::V2,
                    DiscriminatorField::structural("_class"),
                )
                .register_all(&TransactionEventCode::ALL, TransactionEventCode::v2_tag)
                .build()?,
            )
    })
});

impl Polymorphic for TransactionEvent {
    type Variant = TransactionEventCode;

    const FAMILY: &'static str = "TransactionEvent";
    const NESTED_SCHEMA: SchemaVersion = SchemaVersion::V2;

    fn variant(&self) -> TransactionEventCode {
        match self {
            TransactionEvent::Activated(_) => TransactionEventCode::TransactionActivatedEvent,
            TransactionEvent::AuthorizationRequested(_) => {
                TransactionEventCode::TransactionAuthorizationRequestedEvent
            }
            TransactionEvent::AuthorizationOutcomeWaiting(_) => {
                TransactionEventCode::TransactionAuthorizationOutcomeWaitingEvent
            }
            TransactionEvent::AuthorizationCompleted(_) => {
                TransactionEventCode::TransactionAuthorizationCompletedEvent
            }
            TransactionEvent::ClosureRequested(_) => {
                TransactionEventCode::TransactionClosureRequestedEvent
            }
            TransactionEvent::Closed(_) => TransactionEventCode::TransactionClosedEvent,
            TransactionEvent::Expired(_) => TransactionEventCode::TransactionExpiredEvent,
            TransactionEvent::UserCanceled(_) => TransactionEventCode::TransactionUserCanceledEvent,
            TransactionEvent::Refunded(_) => TransactionEventCode::TransactionRefundedEvent,
        }
    }

    fn resolver() -> Arc<DiscriminatorResolver<TransactionEventCode>> {
        Arc::clone(&EVENT_RESOLVER)
    }

    fn to_payload(&self) -> serde_json::Result<Value> {
        let mut payload = match self {
            TransactionEvent::Activated(e) => serde_json::to_value(e)?,
            TransactionEvent::AuthorizationRequested(e) => serde_json::to_value(e)?,
            TransactionEvent::AuthorizationOutcomeWaiting(e) => serde_json::to_value(e)?,
            TransactionEvent::AuthorizationCompleted(e) => serde_json::to_value(e)?,
            TransactionEvent::ClosureRequested(e) => serde_json::to_value(e)?,
            TransactionEvent::Closed(e) => serde_json::to_value(e)?,
            TransactionEvent::Expired(e) => serde_json::to_value(e)?,
            TransactionEvent::UserCanceled(e) => serde_json::to_value(e)?,
            TransactionEvent::Refunded(e) => serde_json::to_value(e)?,
        };
        if let Value::Object(fields) = &mut payload {
            fields.insert(
                "eventCode".to_string(),
                Value::String(self.event_code().as_str().to_string()),
            );
        }
        Ok(payload)
    }

    fn from_payload(variant: TransactionEventCode, payload: Value) -> serde_json::Result<Self> {
        match variant {
            TransactionEventCode::TransactionActivatedEvent => {
                serde_json::from_value(payload).map(TransactionEvent::Activated)
            }
            TransactionEventCode::TransactionAuthorizationRequestedEvent => {
                serde_json::from_value(payload).map(TransactionEvent::AuthorizationRequested)
            }
            TransactionEventCode::TransactionAuthorizationOutcomeWaitingEvent => {
                serde_json::from_value(payload).map(TransactionEvent::AuthorizationOutcomeWaiting)
            }
            TransactionEventCode::TransactionAuthorizationCompletedEvent => {
                serde_json::from_value(payload).map(TransactionEvent::AuthorizationCompleted)
            }
            TransactionEventCode::TransactionClosureRequestedEvent => {
                serde_json::from_value(payload).map(TransactionEvent::ClosureRequested)
            }
            TransactionEventCode::TransactionClosedEvent => {
                serde_json::from_value(payload).map(TransactionEvent::Closed)
            }
            TransactionEventCode::TransactionExpiredEvent => {
                serde_json::from_value(payload).map(TransactionEvent::Expired)
            }
            TransactionEventCode::TransactionUserCanceledEvent => {
                serde_json::from_value(payload).map(TransactionEvent::UserCanceled)
            }
            TransactionEventCode::TransactionRefundedEvent => {
                serde_json::from_value(payload).map(TransactionEvent::Refunded)
            }
        }
    }
}
