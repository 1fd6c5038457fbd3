use std::sync::Arc;

use axum::{Json, body::Bytes, extract::Extension, response::IntoResponse};

use crate::app::{dto::IngestResponse, errors, services::AppServices};

/// POST /api/ingest
///
/// Body: any JSON document except `null`. Requires `x-ingest-secret`.
pub async fn ingest(Extension(services): Extension<Arc<AppServices>>, body: Bytes) -> axum::response::Response {
    match services.store.ingest(&body).await {
        Ok(id) => Json(IngestResponse { ok: true, id }).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}
