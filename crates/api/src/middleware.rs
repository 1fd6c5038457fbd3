use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode, header},
    middleware::Next,
    response::Response,
};
use chrono::Utc;

use hooklog_auth::{Credentials, SessionValidator};

use crate::app::errors::json_error;
use crate::context::ViewerContext;

/// Header carrying the webhook sender's shared secret.
pub const INGEST_SECRET_HEADER: &str = "x-ingest-secret";

#[derive(Clone)]
pub struct SessionAuthState {
    /// `None` when no session secret is configured: every session is rejected.
    pub sessions: Option<Arc<dyn SessionValidator>>,
    pub cookie_name: Arc<str>,
}

#[derive(Clone)]
pub struct IngestAuthState {
    pub credentials: Arc<Credentials>,
}

fn unauthorized() -> Response {
    json_error(StatusCode::UNAUTHORIZED, "unauthorized", "unauthorized")
}

/// Require a valid viewer session cookie.
pub async fn session_middleware(
    State(state): State<SessionAuthState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, Response> {
    let sessions = state.sessions.as_ref().ok_or_else(unauthorized)?;
    let token = extract_cookie(req.headers(), &state.cookie_name).ok_or_else(unauthorized)?;

    let claims = sessions
        .validate(token, Utc::now())
        .map_err(|_e| unauthorized())?;

    req.extensions_mut().insert(ViewerContext::new(claims));

    Ok(next.run(req).await)
}

/// Require the shared ingest secret.
pub async fn ingest_secret_middleware(
    State(state): State<IngestAuthState>,
    req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, Response> {
    let presented = req
        .headers()
        .get(INGEST_SECRET_HEADER)
        .and_then(|v| v.to_str().ok());

    state
        .credentials
        .check_ingest(presented)
        .map_err(|_e| unauthorized())?;

    Ok(next.run(req).await)
}

/// Value of cookie `name` from the request's `Cookie` headers.
fn extract_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(k, _)| *k == name)
        .map(|(_, v)| v.trim())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn finds_the_named_cookie() {
        let mut headers = HeaderMap::new();
        headers.append(header::COOKIE, HeaderValue::from_static("theme=dark; wv_auth=tok.en.sig"));
        headers.append(header::COOKIE, HeaderValue::from_static("other=1"));
        assert_eq!(extract_cookie(&headers, "wv_auth"), Some("tok.en.sig"));
        assert_eq!(extract_cookie(&headers, "other"), Some("1"));
        assert_eq!(extract_cookie(&headers, "missing"), None);
    }

    #[test]
    fn empty_cookie_counts_as_missing() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("wv_auth="));
        assert_eq!(extract_cookie(&headers, "wv_auth"), None);
    }
}
