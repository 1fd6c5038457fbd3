//! Event browsing for the operator.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, Query},
    response::IntoResponse,
};

use tracing::debug;

use crate::app::{
    dto::{EventsQuery, EventsResponse},
    errors,
    services::AppServices,
};
use crate::context::ViewerContext;

/// GET /api/events?q=..&limit=..
///
/// Newest first. `q` is a case-insensitive substring of the payload JSON;
/// `limit` defaults to 300 and is clamped server-side.
pub async fn list_events(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(viewer): Extension<ViewerContext>,
    Query(query): Query<EventsQuery>,
) -> axum::response::Response {
    debug!(session = %viewer.claims().jti, "browsing events");
    match services.store.list(&query.into_list_query()).await {
        Ok(events) => Json(EventsResponse::from(events)).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}
