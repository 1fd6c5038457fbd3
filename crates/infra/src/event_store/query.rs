//! Search and limiting over a materialized, newest-first record list.
//!
//! Matching is a case-insensitive substring test against the payload's
//! canonical JSON text. There is no ranking: output order is input order.

use serde::{Deserialize, Serialize};

use hooklog_events::EventRecord;

/// Caller-supplied browse parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListQuery {
    /// Substring to look for; empty matches everything.
    #[serde(default, rename = "q")]
    pub search: String,
    /// Requested result count; clamped by the store.
    #[serde(default)]
    pub limit: Option<usize>,
}

impl ListQuery {
    pub fn new(search: impl Into<String>, limit: Option<usize>) -> Self {
        Self {
            search: search.into(),
            limit,
        }
    }

    /// Everything, up to the default limit.
    pub fn all() -> Self {
        Self::default()
    }
}

/// Resolve the caller's limit: `default` when absent, never above `max`.
///
/// A requested limit of 0 yields 0.
pub fn clamp_limit(requested: Option<usize>, default: usize, max: usize) -> usize {
    requested.unwrap_or(default).min(max)
}

/// Keep records whose payload contains `search` (case-insensitively), in
/// input order, truncated to `limit`.
pub fn filter(records: Vec<EventRecord>, search: &str, limit: usize) -> Vec<EventRecord> {
    if search.is_empty() {
        let mut records = records;
        records.truncate(limit);
        return records;
    }

    let needle = search.to_lowercase();
    records
        .into_iter()
        .filter(|r| r.payload.search_text().contains(&needle))
        .take(limit)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use hooklog_events::Payload;
    use proptest::prelude::*;
    use serde_json::json;

    fn record(n: usize, payload: serde_json::Value) -> EventRecord {
        EventRecord::new(
            format!("evt-{n}").parse().unwrap(),
            Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
            Payload::from_value(payload).unwrap(),
        )
    }

    fn ids(records: &[EventRecord]) -> Vec<&str> {
        records.iter().map(|r| r.id.as_str()).collect()
    }

    #[test]
    fn empty_search_is_identity_truncated() {
        let records: Vec<_> = (0..5).map(|n| record(n, json!({"n": n}))).collect();
        let out = filter(records, "", 3);
        assert_eq!(ids(&out), vec!["evt-0", "evt-1", "evt-2"]);
    }

    #[test]
    fn search_is_case_insensitive_and_order_preserving() {
        let records = vec![
            record(1, json!({"type": "Order.Created"})),
            record(2, json!({"type": "invoice.paid"})),
            record(3, json!({"note": "ORDER shipped"})),
        ];
        let out = filter(records, "oRdEr", 10);
        assert_eq!(ids(&out), vec!["evt-1", "evt-3"]);
    }

    #[test]
    fn search_matches_keys_and_json_punctuation() {
        let records = vec![
            record(1, json!({"customer_id": 42})),
            record(2, json!({"a": 1})),
        ];
        assert_eq!(ids(&filter(records.clone(), "customer_id", 10)), vec!["evt-1"]);
        assert_eq!(ids(&filter(records, "\"a\":1", 10)), vec!["evt-2"]);
    }

    #[test]
    fn search_text_is_not_trimmed() {
        let records = vec![record(1, json!("hello world")), record(2, json!("helloworld"))];
        assert_eq!(ids(&filter(records, "o w", 10)), vec!["evt-1"]);
    }

    #[test]
    fn limit_applies_after_matching() {
        let records: Vec<_> = (0..10)
            .map(|n| record(n, json!({"even": n % 2 == 0})))
            .collect();
        let out = filter(records, "true", 2);
        assert_eq!(ids(&out), vec!["evt-0", "evt-2"]);
    }

    #[test]
    fn clamp_limit_defaults_and_caps() {
        assert_eq!(clamp_limit(None, 300, 500), 300);
        assert_eq!(clamp_limit(Some(10), 300, 500), 10);
        assert_eq!(clamp_limit(Some(10_000), 300, 500), 500);
        assert_eq!(clamp_limit(Some(0), 300, 500), 0);
        assert_eq!(clamp_limit(None, 300, 100), 100);
    }

    #[test]
    fn list_query_reads_q_and_limit() {
        let q: ListQuery = serde_json::from_value(json!({"q": "abc", "limit": 5})).unwrap();
        assert_eq!(q, ListQuery::new("abc", Some(5)));
        let q: ListQuery = serde_json::from_value(json!({})).unwrap();
        assert_eq!(q, ListQuery::all());
    }

    proptest! {
        #![proptest_config(ProptestConfig { cases: 128, ..ProptestConfig::default() })]

        #[test]
        fn filter_keeps_exactly_the_matching_records_in_order(
            words in proptest::collection::vec("[a-zA-Z]{0,6}", 0..30),
            search in "[a-zA-Z]{0,2}",
            limit in 0usize..40,
        ) {
            let records: Vec<_> = words
                .iter()
                .enumerate()
                .map(|(n, w)| record(n, json!({ "w": w })))
                .collect();

            let expected: Vec<String> = records
                .iter()
                .filter(|r| r.payload.search_text().contains(&search.to_lowercase()))
                .take(limit)
                .map(|r| r.id.to_string())
                .collect();

            let out: Vec<String> = filter(records, &search, limit)
                .into_iter()
                .map(|r| r.id.to_string())
                .collect();
            prop_assert_eq!(out, expected);
        }

        #[test]
        fn empty_search_never_drops_within_limit(n in 0usize..50, limit in 0usize..60) {
            let records: Vec<_> = (0..n).map(|i| record(i, json!(i))).collect();
            prop_assert_eq!(filter(records, "", limit).len(), n.min(limit));
        }
    }
}
