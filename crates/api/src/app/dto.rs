use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use hooklog_core::EventId;
use hooklog_events::EventRecord;
use hooklog_infra::ListQuery;

// -------------------------
// Request DTOs
// -------------------------

/// `GET /api/events?q=..&limit=..`
///
/// `limit` is taken as text: anything that is not a non-negative integer
/// falls back to the default limit.
#[derive(Debug, Default, Deserialize)]
pub struct EventsQuery {
    pub q: Option<String>,
    pub limit: Option<String>,
}

impl EventsQuery {
    pub fn into_list_query(self) -> ListQuery {
        let limit = self.limit.and_then(|raw| raw.trim().parse::<usize>().ok());
        ListQuery::new(self.q.unwrap_or_default(), limit)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub password: String,
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct OkResponse {
    pub ok: bool,
}

impl OkResponse {
    pub fn ok() -> Self {
        Self { ok: true }
    }
}

#[derive(Debug, Serialize)]
pub struct IngestResponse {
    pub ok: bool,
    pub id: EventId,
}

#[derive(Debug, Serialize)]
pub struct EventsResponse {
    pub ok: bool,
    pub count: usize,
    pub events: Vec<EventRecord>,
}

impl From<Vec<EventRecord>> for EventsResponse {
    fn from(events: Vec<EventRecord>) -> Self {
        Self {
            ok: true,
            count: events.len(),
            events,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearResponse {
    pub ok: bool,
    pub cleared_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lenient_limit_parsing() {
        let q = EventsQuery {
            q: Some("abc".into()),
            limit: Some("25".into()),
        };
        assert_eq!(q.into_list_query(), ListQuery::new("abc", Some(25)));

        for junk in ["", "-1", "ten", "1.5"] {
            let q = EventsQuery {
                q: None,
                limit: Some(junk.into()),
            };
            assert_eq!(q.into_list_query(), ListQuery::new("", None), "{junk:?}");
        }
    }
}
