#![allow(dead_code)]

use payment_commons::config::KeyspaceSettings;
use payment_commons::documents::events::{
    ClientId, Event, PaymentNotice, TransactionActivatedData, TransactionEvent,
};
use payment_commons::documents::gateway::{GatewayActivationData, NpgActivationData};
use rand::Rng;
use std::io::Write;
use std::time::Duration;
use tempfile::NamedTempFile;

pub const TRANSACTION_ID: &str = "93cce28d3b7c4cb9975e6d856ecee89f";

pub fn lock_settings() -> KeyspaceSettings {
    KeyspaceSettings::new("exclusiveLocks", Duration::from_secs(5)).unwrap()
}

/// Resource name unique to one test run.
pub fn random_resource(prefix: &str) -> String {
    let suffix: u64 = rand::thread_rng().gen_range(0..u64::MAX);
    format!("{prefix}-{suffix:016x}")
}

pub fn npg_activation_data() -> NpgActivationData {
    NpgActivationData {
        order_id: "o1".to_string(),
        correlation_id: "c1".to_string(),
        session_id: Some("s1".to_string()),
    }
}

pub fn activated_event(gateway: Option<GatewayActivationData>) -> TransactionEvent {
    TransactionEvent::Activated(
        Event::new(
            TRANSACTION_ID,
            TransactionActivatedData {
                email: "buyer@example.com".to_string(),
                payment_notices: vec![PaymentNotice {
                    payment_token: "paymentToken".to_string(),
                    rpt_id: "77777777777302016723749670035".to_string(),
                    description: "TARI/TEFA 2024".to_string(),
                    amount: 100,
                    payment_context_code: None,
                    is_all_ccp: false,
                }],
                fault_code: None,
                fault_code_string: None,
                client_id: ClientId::Checkout,
                id_cart: None,
                payment_token_validity_seconds: 900,
                transaction_gateway_activation_data: gateway,
            },
        )
        .unwrap(),
    )
}

pub fn write_jsonl(lines: &[&str]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    for line in lines {
        writeln!(file, "{line}").unwrap();
    }
    file
}
