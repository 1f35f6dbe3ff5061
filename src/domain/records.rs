use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Applicative lock record.
///
/// Keyed by `id`, the name of the protected resource. The backend TTL of the
/// record is the lease duration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExclusiveLockDocument {
    /// Resource name, unique per lock.
    pub id: String,
    pub creation_date: String,
    /// Opaque identity of the process holding the lock.
    pub holder_name: String,
}

impl ExclusiveLockDocument {
    /// Creates a lock record stamped with the current time.
    pub fn new(id: impl Into<String>, holder_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            creation_date: now(),
            holder_name: holder_name.into(),
        }
    }

    pub fn key(&self) -> String {
        self.id.clone()
    }
}

/// Volatile marker recording that an id (e.g. a generated order id) was used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UniqueIdDocument {
    pub id: String,
    pub creation_date: String,
}

impl UniqueIdDocument {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            creation_date: now(),
        }
    }

    pub fn key(&self) -> String {
        self.id.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_document_wire_form() {
        let doc = ExclusiveLockDocument::new("txn-42", "procA");
        let json = serde_json::to_value(&doc).unwrap();

        assert_eq!(json["id"], "txn-42");
        assert_eq!(json["holderName"], "procA");
        assert!(json["creationDate"].as_str().unwrap().ends_with('Z'));
        assert_eq!(doc.key(), "txn-42");
    }

    #[test]
    fn test_unique_id_document_deserialization() {
        let doc: UniqueIdDocument =
            serde_json::from_str(r#"{"id":"E1700000000000","creationDate":"2024-01-01T00:00:00Z"}"#)
                .unwrap();
        assert_eq!(doc.key(), "E1700000000000");
    }
}
