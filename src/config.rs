use crate::error::{StoreError, StoreResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const KEY_SEPARATOR: char = ':';

/// Keyspace and default TTL a store instance is bound to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyspaceSettings {
    pub keyspace: String,
    pub ttl_seconds: u64,
}

impl KeyspaceSettings {
    pub fn new(keyspace: impl Into<String>, ttl: Duration) -> StoreResult<Self> {
        let settings = Self {
            keyspace: keyspace.into(),
            ttl_seconds: ttl.as_secs(),
        };
        settings.validate()?;
        Ok(settings)
    }

    /// Checks settings obtained through deserialization.
    pub fn validate(&self) -> StoreResult<()> {
        if self.keyspace.is_empty() {
            return Err(StoreError::InvalidSettings(
                "keyspace must not be empty".to_string(),
            ));
        }
        if self.keyspace.contains(KEY_SEPARATOR) {
            return Err(StoreError::InvalidSettings(format!(
                "keyspace `{}` must not contain `{KEY_SEPARATOR}`",
                self.keyspace
            )));
        }
        if self.ttl_seconds == 0 {
            return Err(StoreError::InvalidTtl(Duration::from_secs(self.ttl_seconds)));
        }
        Ok(())
    }

    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }

    /// Full backend key of a record.
    pub fn compound_key(&self, key: &str) -> String {
        format!("{}{KEY_SEPARATOR}{key}", self.keyspace)
    }

    /// Backend key prefix shared by every record of the keyspace.
    pub fn prefix(&self) -> String {
        format!("{}{KEY_SEPARATOR}", self.keyspace)
    }
}

/// Truncates `ttl` to whole seconds, rejecting anything below one second.
pub fn whole_seconds(ttl: Duration) -> StoreResult<Duration> {
    match ttl.as_secs() {
        0 => Err(StoreError::InvalidTtl(ttl)),
        secs => Ok(Duration::from_secs(secs)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_settings() {
        let settings =
            KeyspaceSettings::new("exclusive-locks", Duration::from_millis(2500)).unwrap();
        assert_eq!(settings.ttl_seconds, 2);
        assert_eq!(settings.compound_key("txn-42"), "exclusive-locks:txn-42");
        assert_eq!(settings.prefix(), "exclusive-locks:");
    }

    #[test]
    fn test_invalid_settings() {
        assert!(matches!(
            KeyspaceSettings::new("", Duration::from_secs(1)),
            Err(StoreError::InvalidSettings(_))
        ));
        assert!(matches!(
            KeyspaceSettings::new("a:b", Duration::from_secs(1)),
            Err(StoreError::InvalidSettings(_))
        ));
        assert!(matches!(
            KeyspaceSettings::new("locks", Duration::from_millis(999)),
            Err(StoreError::InvalidTtl(_))
        ));
    }

    #[test]
    fn test_settings_wire_form() {
        let settings: KeyspaceSettings =
            serde_json::from_str(r#"{"keyspace":"uniqueIds","ttlSeconds":60}"#).unwrap();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.default_ttl(), Duration::from_secs(60));
    }

    #[test]
    fn test_whole_seconds() {
        assert_eq!(
            whole_seconds(Duration::from_millis(1999)).unwrap(),
            Duration::from_secs(1)
        );
        assert!(whole_seconds(Duration::from_millis(500)).is_err());
    }
}
