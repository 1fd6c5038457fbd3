use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;
use tracing::{error, warn};

use hooklog_auth::AuthError;
use hooklog_infra::StoreError;

pub fn store_error_to_response(err: StoreError) -> axum::response::Response {
    match err {
        StoreError::InvalidPayload(msg) => json_error(StatusCode::BAD_REQUEST, "invalid_payload", msg),
        StoreError::BackendUnavailable(msg) => {
            error!(error = %msg, "storage backend unavailable");
            json_error(StatusCode::SERVICE_UNAVAILABLE, "backend_unavailable", msg)
        }
    }
}

pub fn auth_error_to_response(err: AuthError) -> axum::response::Response {
    match err {
        AuthError::Unauthorized => json_error(StatusCode::UNAUTHORIZED, "unauthorized", "unauthorized"),
        AuthError::NotConfigured(what) => {
            warn!(setting = what, "login attempted without configured credentials");
            json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "not_configured",
                format!("{what} not set"),
            )
        }
        AuthError::Issue(msg) => {
            error!(error = %msg, "failed to issue session");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "session_error", "failed to issue session")
        }
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "ok": false,
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
