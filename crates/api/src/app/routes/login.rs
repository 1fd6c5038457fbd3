//! Operator login/logout via a session cookie.

use std::sync::Arc;

use axum::{
    Json,
    body::Bytes,
    extract::Extension,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use chrono::Utc;
use tracing::info;

use hooklog_auth::{AuthError, SESSION_TTL_DAYS};

use crate::app::{
    dto::{LoginRequest, OkResponse},
    errors,
    services::{AppServices, CookieSettings},
};

const SESSION_MAX_AGE_SECS: i64 = SESSION_TTL_DAYS * 24 * 60 * 60;

fn session_cookie(cookie: &CookieSettings, value: &str, max_age: i64) -> String {
    let mut out = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        cookie.name, value, max_age
    );
    if cookie.secure {
        out.push_str("; Secure");
    }
    out
}

fn with_cookie(cookie: String) -> Response {
    match HeaderValue::from_str(&cookie) {
        Ok(value) => ([(header::SET_COOKIE, value)], Json(OkResponse::ok())).into_response(),
        Err(_) => errors::json_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "session_error",
            "invalid cookie name",
        ),
    }
}

/// POST /api/login
///
/// Body: `{ "password": "..." }`. A body that is not valid JSON counts as an
/// empty password.
pub async fn login(Extension(services): Extension<Arc<AppServices>>, body: Bytes) -> Response {
    let request: LoginRequest = serde_json::from_slice(&body).unwrap_or_default();

    if let Err(e) = services.credentials.check_password(&request.password) {
        return errors::auth_error_to_response(e);
    }

    let Some(sessions) = services.sessions.as_ref() else {
        return errors::auth_error_to_response(AuthError::NotConfigured("HOOKLOG_SESSION_SECRET"));
    };
    let token = match sessions.issue(Utc::now()) {
        Ok((token, _claims)) => token,
        Err(e) => return errors::auth_error_to_response(e),
    };

    info!("viewer logged in");
    with_cookie(session_cookie(&services.cookie, &token, SESSION_MAX_AGE_SECS))
}

/// POST /api/logout
pub async fn logout(Extension(services): Extension<Arc<AppServices>>) -> Response {
    with_cookie(session_cookie(&services.cookie, "", 0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cookie_attributes() {
        let plain = CookieSettings {
            name: "wv_auth".to_string(),
            secure: false,
        };
        assert_eq!(
            session_cookie(&plain, "tok", SESSION_MAX_AGE_SECS),
            "wv_auth=tok; Path=/; HttpOnly; SameSite=Lax; Max-Age=2592000"
        );

        let secure = CookieSettings {
            secure: true,
            ..plain
        };
        assert!(session_cookie(&secure, "", 0).ends_with("Max-Age=0; Secure"));
    }
}
