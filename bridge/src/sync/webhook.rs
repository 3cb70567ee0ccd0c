//! Inbound webhook payloads
//!
//! The vendor posts a form with `lockId` and `records`, the latter being a
//! JSON-encoded array of lock records.

use serde_json::Value;

use crate::authn::credentials::Credentials;
use crate::errors::BridgeError;
use crate::records::{reconcile_values_for_lock, Reconciliation};
use crate::utils::md5_hex;

/// Decoded webhook callback
#[derive(Debug, Clone, PartialEq)]
pub struct WebhookPayload {
    pub lock_id: i64,
    /// Raw records, malformed entries are skipped at reconciliation
    pub records: Vec<Value>,
}

impl WebhookPayload {
    /// Parse a `application/x-www-form-urlencoded` body
    pub fn from_form(body: &str) -> Result<Self, BridgeError> {
        let mut lock_id = None;
        let mut records = None;

        for (key, value) in url::form_urlencoded::parse(body.as_bytes()) {
            match key.as_ref() {
                "lockId" if lock_id.is_none() => lock_id = Some(value.into_owned()),
                "records" if records.is_none() => records = Some(value.into_owned()),
                _ => {}
            }
        }

        let lock_id = lock_id
            .ok_or_else(|| BridgeError::ValidationError("webhook without lockId".to_string()))?;
        let lock_id: i64 = lock_id.trim().parse().map_err(|_| {
            BridgeError::ValidationError(format!("invalid webhook lockId: {}", lock_id))
        })?;

        let records = records
            .ok_or_else(|| BridgeError::ValidationError("webhook without records".to_string()))?;
        let records = match serde_json::from_str(&records)? {
            Value::Array(records) => records,
            _ => {
                return Err(BridgeError::ValidationError(
                    "webhook records is not an array".to_string(),
                ))
            }
        };

        Ok(Self { lock_id, records })
    }

    pub fn reconcile(&self) -> Reconciliation {
        reconcile_values_for_lock(self.lock_id, &self.records)
    }
}

/// Webhook id used when none is configured
pub fn default_webhook_id(credentials: &Credentials) -> String {
    let seed = format!("{}{}", credentials.client_id, credentials.client_secret());
    md5_hex(seed.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ttlock_models::LockState;

    fn encode(lock_id: &str, records: &str) -> String {
        url::form_urlencoded::Serializer::new(String::new())
            .append_pair("lockId", lock_id)
            .append_pair("records", records)
            .finish()
    }

    #[test]
    fn test_parse_and_reconcile() {
        let records = r#"[
            {"lockId":1,"recordType":1,"lockDate":200,"username":"alice","success":1},
            {"lockId":1,"recordType":11,"lockDate":100,"username":"bob","success":1}
        ]"#;
        let payload = WebhookPayload::from_form(&encode("1", records)).unwrap();

        assert_eq!(payload.lock_id, 1);
        assert_eq!(payload.records.len(), 2);

        let reconciliation = payload.reconcile();
        assert_eq!(reconciliation.state, LockState::Unlocked);
        assert_eq!(reconciliation.changed_by, "alice");
    }

    #[test]
    fn test_rejects_missing_fields() {
        assert!(WebhookPayload::from_form("records=%5B%5D").is_err());
        assert!(WebhookPayload::from_form("lockId=1").is_err());
        assert!(WebhookPayload::from_form(&encode("abc", "[]")).is_err());
        assert!(WebhookPayload::from_form(&encode("1", "{}")).is_err());
        assert!(WebhookPayload::from_form(&encode("1", "not json")).is_err());
    }

    #[test]
    fn test_default_webhook_id_is_stable() {
        let creds = Credentials::new("https://euapi.ttlock.com", "cid", "csecret", "alice");
        assert_eq!(default_webhook_id(&creds), md5_hex(b"cidcsecret"));
        assert_eq!(default_webhook_id(&creds).len(), 32);
    }
}
