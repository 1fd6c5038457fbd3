//! HTTP API application wiring (Axum router + service wiring).
//!
//! This folder is structured like:
//! - `services.rs`: store, credentials and session wiring
//! - `routes/`: HTTP routes + handlers (one file per area)
//! - `dto.rs`: request/response DTOs
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{Extension, Router, routing::get};
use tower::ServiceBuilder;

use hooklog_auth::SessionValidator;
use hooklog_infra::HookConfig;

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub async fn build_app(cfg: &HookConfig) -> anyhow::Result<Router> {
    let services = Arc::new(services::build_services(cfg).await?);
    Ok(router_with(services))
}

/// Router over already-built services.
pub fn router_with(services: Arc<services::AppServices>) -> Router {
    let session_state = middleware::SessionAuthState {
        sessions: services
            .sessions
            .clone()
            .map(|s| s as Arc<dyn SessionValidator>),
        cookie_name: Arc::from(services.cookie.name.as_str()),
    };
    let ingest_state = middleware::IngestAuthState {
        credentials: services.credentials.clone(),
    };

    // Webhook senders: shared secret header.
    let sender = routes::sender_router().layer(axum::middleware::from_fn_with_state(
        ingest_state,
        middleware::ingest_secret_middleware,
    ));

    // Operator browsing: session cookie.
    let viewer = routes::viewer_router().layer(axum::middleware::from_fn_with_state(
        session_state,
        middleware::session_middleware,
    ));

    Router::new()
        .route("/health", get(routes::system::health))
        .nest(
            "/api",
            routes::public_router().merge(sender).merge(viewer),
        )
        .layer(Extension(services))
        .layer(ServiceBuilder::new())
}
