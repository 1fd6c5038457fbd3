//! EventRecord codec.
//!
//! Every backend stores records as the JSON produced by [`encode`]. Reading is
//! deliberately forgiving: [`decode_lossy`] drops records that fail to decode
//! and keeps going, so one corrupt entry never makes the rest of the log
//! unreadable.

use thiserror::Error;
use tracing::warn;

use crate::record::EventRecord;

#[derive(Debug, Error)]
#[error("failed to encode event record: {0}")]
pub struct EncodeError(String);

/// A single stored record could not be decoded.
///
/// Always recovered locally (the record is skipped); never surfaced to callers
/// of the store.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("record is not valid JSON: {0}")]
    Malformed(String),

    #[error("record has the wrong shape: {0}")]
    Shape(String),

    #[error("record has an empty id")]
    EmptyId,
}

pub fn encode(record: &EventRecord) -> Result<Vec<u8>, EncodeError> {
    serde_json::to_vec(record).map_err(|e| EncodeError(e.to_string()))
}

pub fn decode(bytes: &[u8]) -> Result<EventRecord, DecodeError> {
    let value: serde_json::Value =
        serde_json::from_slice(bytes).map_err(|e| DecodeError::Malformed(e.to_string()))?;
    let record: EventRecord =
        serde_json::from_value(value).map_err(|e| DecodeError::Shape(e.to_string()))?;
    if record.id.as_str().trim().is_empty() {
        return Err(DecodeError::EmptyId);
    }
    Ok(record)
}

/// Decode a batch, skipping (and logging) entries that fail.
///
/// Input order is preserved for the entries that survive.
pub fn decode_lossy<I, B>(items: I) -> Vec<EventRecord>
where
    I: IntoIterator<Item = B>,
    B: AsRef<[u8]>,
{
    items
        .into_iter()
        .enumerate()
        .filter_map(|(idx, bytes)| match decode(bytes.as_ref()) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(index = idx, error = %e, "skipping undecodable event record");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::Payload;
    use chrono::{TimeZone, Utc};
    use proptest::prelude::*;
    use serde_json::{Value as JsonValue, json};

    fn record(id: &str, payload: JsonValue) -> EventRecord {
        EventRecord::new(
            id.parse().unwrap(),
            Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
            Payload::from_value(payload).unwrap(),
        )
    }

    #[test]
    fn decodes_what_it_encodes() {
        let original = record("evt-1", json!({"entry": [{"id": "123", "changes": []}]}));
        let bytes = encode(&original).unwrap();
        assert_eq!(decode(&bytes).unwrap(), original);
    }

    #[test]
    fn accepts_records_written_by_older_deployments() {
        let legacy = br#"{
            "id": "9b2f7c1e-4a43-4a57-9d0f-2f5a3e1b8c10",
            "receivedAt": "2024-02-03T04:05:06.789Z",
            "payload": {"object": "page"}
        }"#;
        let decoded = decode(legacy).unwrap();
        assert_eq!(decoded.payload.as_value()["object"], "page");
    }

    #[test]
    fn classifies_failures() {
        assert!(matches!(decode(b"\x00\x01garbage"), Err(DecodeError::Malformed(_))));
        assert!(matches!(decode(br#"{"id":"x"}"#), Err(DecodeError::Shape(_))));
        assert!(matches!(
            decode(br#"{"id":"x","receivedAt":"yesterday","payload":1}"#),
            Err(DecodeError::Shape(_))
        ));
        assert!(matches!(
            decode(br#"{"id":" ","receivedAt":"2024-02-03T04:05:06Z","payload":1}"#),
            Err(DecodeError::EmptyId)
        ));
    }

    #[test]
    fn corrupt_entry_does_not_affect_siblings() {
        let a = encode(&record("evt-a", json!({"n": 1}))).unwrap();
        let c = encode(&record("evt-c", json!({"n": 3}))).unwrap();
        let corrupt = b"{\"id\": \"evt-b\", \"receivedAt\": ".to_vec();

        let decoded = decode_lossy(vec![a, corrupt, c]);
        let ids: Vec<_> = decoded.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["evt-a", "evt-c"]);
    }

    fn arb_json() -> impl Strategy<Value = JsonValue> {
        let leaf = prop_oneof![
            any::<bool>().prop_map(JsonValue::Bool),
            any::<i64>().prop_map(|n| json!(n)),
            "[a-zA-Z0-9 _\\-\"\\\\]{0,12}".prop_map(JsonValue::String),
        ];
        leaf.prop_recursive(3, 32, 6, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..6).prop_map(JsonValue::Array),
                prop::collection::btree_map("[a-z]{1,6}", inner, 0..6)
                    .prop_map(|m| JsonValue::Object(m.into_iter().collect())),
            ]
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 128,
            ..ProptestConfig::default()
        })]

        /// Property: decode(encode(r)) reproduces the payload structurally.
        #[test]
        fn payload_survives_codec(value in arb_json()) {
            prop_assume!(!value.is_null());
            let original = record("evt-prop", value);
            let bytes = encode(&original).unwrap();
            let decoded = decode(&bytes).unwrap();
            prop_assert_eq!(decoded.payload, original.payload);
            prop_assert_eq!(decoded.id, original.id);
        }
    }
}
