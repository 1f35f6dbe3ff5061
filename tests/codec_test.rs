mod common;

use common::{TRANSACTION_ID, activated_event, npg_activation_data};
use payment_commons::documents::events::{
    Event, Outcome, PaymentGateway, TransactionAuthorizationCompletedData,
    TransactionAuthorizationRequestData, TransactionClosureData, TransactionEvent,
    TransactionEventCode, TransactionExpiredData, TransactionRefundedData,
};
use payment_commons::documents::gateway::{
    GatewayActivationData, GatewayAuthorizationRequestedData, NpgAuthorizationRequestedData,
    RedirectAuthorizationRequestedData,
};
use payment_commons::domain::schema::SchemaVersion;
use payment_commons::error::CodecError;
use payment_commons::serialization::PolymorphicCodec;
use serde_json::Value;

fn authorization_requested(gateway: GatewayAuthorizationRequestedData) -> TransactionEvent {
    TransactionEvent::AuthorizationRequested(
        Event::new(
            TRANSACTION_ID,
            TransactionAuthorizationRequestData {
                amount: 100,
                fee: 10,
                payment_instrument_id: "paymentInstrumentId".to_string(),
                psp_id: "pspId".to_string(),
                payment_type_code: "CP".to_string(),
                broker_name: "brokerName".to_string(),
                psp_channel_code: "pspChannelCode".to_string(),
                payment_method_name: "CARDS".to_string(),
                psp_business_name: "pspBusinessName".to_string(),
                is_psp_on_us: false,
                authorization_request_id: "authorizationRequestId".to_string(),
                payment_gateway: PaymentGateway::Npg,
                payment_method_description: None,
                transaction_gateway_authorization_requested_data: Some(gateway),
                id_bundle: None,
            },
        )
        .unwrap(),
    )
}

fn one_of_each() -> Vec<TransactionEvent> {
    vec![
        activated_event(Some(GatewayActivationData::Npg(npg_activation_data()))),
        authorization_requested(GatewayAuthorizationRequestedData::Npg(
            NpgAuthorizationRequestedData {
                logo: "http://localhost/mc.png".to_string(),
                brand: "MASTERCARD".to_string(),
                session_id: Some("s1".to_string()),
                confirm_payment_session_id: None,
            },
        )),
        TransactionEvent::AuthorizationOutcomeWaiting(Event::new(TRANSACTION_ID, ()).unwrap()),
        TransactionEvent::AuthorizationCompleted(
            Event::new(
                TRANSACTION_ID,
                TransactionAuthorizationCompletedData {
                    authorization_code: Some("123456".to_string()),
                    rrn: Some("rrn".to_string()),
                    timestamp_operation: Some("2024-05-01T10:00:00.000Z".to_string()),
                    outcome: Outcome::Ok,
                },
            )
            .unwrap(),
        ),
        TransactionEvent::ClosureRequested(Event::new(TRANSACTION_ID, ()).unwrap()),
        TransactionEvent::Closed(
            Event::new(
                TRANSACTION_ID,
                TransactionClosureData {
                    response_outcome: Outcome::Ko,
                },
            )
            .unwrap(),
        ),
        TransactionEvent::Expired(
            Event::new(
                TRANSACTION_ID,
                TransactionExpiredData {
                    status_before_expiration: "AUTHORIZATION_REQUESTED".to_string(),
                },
            )
            .unwrap(),
        ),
        TransactionEvent::UserCanceled(Event::new(TRANSACTION_ID, ()).unwrap()),
        TransactionEvent::Refunded(
            Event::new(
                TRANSACTION_ID,
                TransactionRefundedData {
                    status_before_refunded: "REFUND_REQUESTED".to_string(),
                },
            )
            .unwrap(),
        ),
    ]
}

#[test]
fn test_every_event_round_trips_under_current_schema() {
    let codec = PolymorphicCodec::<TransactionEvent>::new(SchemaVersion::V2);
    let events = one_of_each();
    assert_eq!(events.len(), TransactionEventCode::ALL.len());

    for event in events {
        let bytes = codec.encode(&event).unwrap();
        assert_eq!(codec.decode(&bytes, SchemaVersion::V2).unwrap(), event);
    }
}

#[test]
fn test_legacy_events_round_trip_under_legacy_schema() {
    let codec = PolymorphicCodec::<TransactionEvent>::new(SchemaVersion::V1);

    for event in one_of_each() {
        match codec.encode(&event) {
            Ok(bytes) => assert_eq!(codec.decode(&bytes, SchemaVersion::V1).unwrap(), event),
            Err(CodecError::UnknownVariant { .. }) => assert!(matches!(
                event,
                TransactionEvent::AuthorizationOutcomeWaiting(_)
                    | TransactionEvent::ClosureRequested(_)
            )),
            Err(other) => panic!("unexpected error {other}"),
        }
    }
}

#[test]
fn test_npg_activation_data_under_current_schema() {
    let codec = PolymorphicCodec::<GatewayActivationData>::new(SchemaVersion::V2);
    let npg = GatewayActivationData::Npg(npg_activation_data());

    let bytes = codec.encode(&npg).unwrap();
    assert_eq!(
        String::from_utf8(bytes.clone()).unwrap(),
        r#"{"_class":"NPG","orderId":"o1","correlationId":"c1","sessionId":"s1"}"#
    );

    let (descriptor, decoded) = codec
        .decode_with_descriptor(&bytes, SchemaVersion::V2)
        .unwrap();
    assert_eq!(descriptor.tag, "NPG");
    match decoded {
        GatewayActivationData::Npg(data) => {
            assert_eq!(data.order_id, "o1");
            assert_eq!(data.correlation_id, "c1");
            assert_eq!(data.session_id.as_deref(), Some("s1"));
        }
        other => panic!("unexpected variant {other:?}"),
    }
}

#[test]
fn test_nested_gateway_data_is_tagged_inside_event() {
    let codec = PolymorphicCodec::<TransactionEvent>::new(SchemaVersion::V1);
    let event = activated_event(Some(GatewayActivationData::Empty));

    let encoded: Value = serde_json::from_slice(&codec.encode(&event).unwrap()).unwrap();
    assert_eq!(encoded["eventCode"], "TRANSACTION_ACTIVATED_EVENT");
    assert!(encoded.get("_class").is_none());
    assert_eq!(
        encoded["data"]["transactionGatewayActivationData"],
        serde_json::json!({"_class": "EMPTY"})
    );
}

#[test]
fn test_missing_nested_gateway_data_decodes_as_none() {
    let codec = PolymorphicCodec::<TransactionEvent>::new(SchemaVersion::V2);
    let event = activated_event(None);
    let mut encoded = codec.encode_value(&event).unwrap();
    assert_eq!(encoded["data"]["transactionGatewayActivationData"], Value::Null);

    encoded["data"]
        .as_object_mut()
        .unwrap()
        .remove("transactionGatewayActivationData");

    assert_eq!(codec.decode_value(encoded, SchemaVersion::V2).unwrap(), event);
}

#[test]
fn test_redirect_authorization_data_in_current_events() {
    let codec = PolymorphicCodec::<TransactionEvent>::new(SchemaVersion::V2);
    let event = authorization_requested(GatewayAuthorizationRequestedData::Redirect(
        RedirectAuthorizationRequestedData {
            logo: "http://localhost/psp.png".to_string(),
            transaction_outcome_timeout_millis: 60_000,
        },
    ));

    let encoded = codec.encode_value(&event).unwrap();
    assert_eq!(
        encoded["data"]["transactionGatewayAuthorizationRequestedData"]["_class"],
        "REDIRECT"
    );
    assert_eq!(codec.decode_value(encoded, SchemaVersion::V2).unwrap(), event);
}
