use axum::{
    Router,
    routing::{get, post},
};

pub mod clear;
pub mod events;
pub mod ingest;
pub mod login;
pub mod system;

/// Endpoints open to anyone.
pub fn public_router() -> Router {
    Router::new()
        .route("/login", post(login::login))
        .route("/logout", post(login::logout))
}

/// Endpoints for webhook senders (shared-secret protected).
pub fn sender_router() -> Router {
    Router::new()
        .route("/ingest", post(ingest::ingest))
        .route("/clear", post(clear::clear))
}

/// Endpoints for the operator (session protected).
pub fn viewer_router() -> Router {
    Router::new().route("/events", get(events::list_events))
}
