use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};

use hooklog_auth::{Credentials, Hs256Sessions};
use hooklog_core::{Clock, SystemClock, UuidV7Ids};
use hooklog_infra::{EventStore, HookConfig, open_backend};

/// Session cookie attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieSettings {
    pub name: String,
    pub secure: bool,
}

/// Everything request handlers need.
#[derive(Debug, Clone)]
pub struct AppServices {
    pub store: EventStore,
    pub credentials: Arc<Credentials>,
    /// `None` when neither a session secret nor a viewer password is set.
    pub sessions: Option<Arc<Hs256Sessions>>,
    pub cookie: CookieSettings,
}

impl AppServices {
    pub fn new(store: EventStore, cfg: &HookConfig) -> Self {
        let auth = &cfg.auth;
        let credentials = Credentials::new(auth.ingest_secret.clone(), auth.viewer_password.clone());

        let sessions = auth
            .session_secret
            .as_deref()
            .or(auth.viewer_password.as_deref())
            .map(|secret| Arc::new(Hs256Sessions::new(secret)));
        if sessions.is_none() {
            warn!("no session secret or viewer password configured; browsing is disabled");
        }

        Self {
            store,
            credentials: Arc::new(credentials),
            sessions,
            cookie: CookieSettings {
                name: auth.cookie_name.clone(),
                secure: auth.secure_cookies,
            },
        }
    }
}

/// Open the configured backend and wire the store around it.
pub async fn build_services(cfg: &HookConfig) -> anyhow::Result<AppServices> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock::new());
    let backend = open_backend(&cfg.backend, clock.clone())
        .await
        .context("failed to open storage backend")?;

    let store = EventStore::new(backend, clock, Arc::new(UuidV7Ids), cfg.limits);
    info!(
        backend = store.backend_kind(),
        cap = cfg.limits.cap,
        max_limit = cfg.limits.max_limit,
        "event store ready"
    );

    Ok(AppServices::new(store, cfg))
}
