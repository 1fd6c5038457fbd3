use core::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use hooklog_core::CoreError;

/// Opaque structured document received from a webhook sender.
///
/// The store never imposes a schema on payloads. The only operations offered
/// are structural: parse, serialize, and the lowercase text form used by the
/// query engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Payload(JsonValue);

impl Payload {
    /// Parse an ingest body.
    ///
    /// Fails with `InvalidPayload` for anything that is not well-formed JSON,
    /// and for a bare `null` (there is nothing to store).
    pub fn from_slice(body: &[u8]) -> Result<Self, CoreError> {
        let value: JsonValue = serde_json::from_slice(body)
            .map_err(|e| CoreError::invalid_payload(format!("invalid JSON: {e}")))?;
        Self::from_value(value)
    }

    pub fn from_value(value: JsonValue) -> Result<Self, CoreError> {
        if value.is_null() {
            return Err(CoreError::invalid_payload("payload is null"));
        }
        Ok(Self(value))
    }

    pub fn as_value(&self) -> &JsonValue {
        &self.0
    }

    pub fn into_value(self) -> JsonValue {
        self.0
    }

    /// Compact serialization with object keys in sorted order.
    pub fn canonical_text(&self) -> String {
        // serde_json's default map is ordered by key, so this is stable.
        self.0.to_string()
    }

    /// Lowercased canonical text, the haystack for substring search.
    pub fn search_text(&self) -> String {
        self.canonical_text().to_lowercase()
    }
}

impl fmt::Display for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn rejects_malformed_and_null_bodies() {
        assert!(matches!(
            Payload::from_slice(b"{not json"),
            Err(CoreError::InvalidPayload(_))
        ));
        assert!(matches!(
            Payload::from_slice(b"null"),
            Err(CoreError::InvalidPayload(_))
        ));
    }

    #[test]
    fn accepts_scalars_and_arrays() {
        assert!(Payload::from_slice(b"42").is_ok());
        assert!(Payload::from_slice(b"[1, \"a\"]").is_ok());
        assert!(Payload::from_slice(b"\"text\"").is_ok());
    }

    #[test]
    fn canonical_text_sorts_keys() {
        let a = Payload::from_value(json!({"b": 1, "a": 2})).unwrap();
        let b = Payload::from_slice(br#"{"a":2,"b":1}"#).unwrap();
        assert_eq!(a.canonical_text(), b.canonical_text());
        assert_eq!(a.canonical_text(), r#"{"a":2,"b":1}"#);
    }

    #[test]
    fn search_text_is_lowercase() {
        let p = Payload::from_value(json!({"Object": "WhatsApp_Business_Account"})).unwrap();
        assert_eq!(p.search_text(), r#"{"object":"whatsapp_business_account"}"#);
    }
}
