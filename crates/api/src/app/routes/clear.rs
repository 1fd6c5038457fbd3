use std::sync::Arc;

use axum::{Json, extract::Extension, response::IntoResponse};

use crate::app::{dto::ClearResponse, errors, services::AppServices};

/// POST /api/clear
///
/// Hides every event received so far. Requires `x-ingest-secret`.
pub async fn clear(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.store.clear().await {
        Ok(cleared_at) => Json(ClearResponse { ok: true, cleared_at }).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}
