//! Configuration loading and representation.
//!
//! Everything is read once at startup from environment variables. Empty
//! values count as unset. [`HookConfig::from_lookup`] takes any lookup
//! function so tests never touch the process environment.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::info;

use hooklog_core::Clock;

use crate::backend::{
    Backend, BackendError, BlobBackend, FileBackend, FsObjectStore, InMemoryKvClient, InMemoryObjectStore,
    KvBackend, WriteQueue,
};
use crate::event_store::StoreLimits;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var}={value:?} is invalid: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },

    #[error("unknown backend {0:?} (expected file, kv, blob, memory-kv or memory-blob)")]
    UnknownBackend(String),

    #[error("{0}")]
    Unsupported(String),
}

/// Which storage variant to run, with its settings.
#[derive(Clone, PartialEq, Eq)]
pub enum BackendConfig {
    File { path: PathBuf },
    Kv { url: String, key: String },
    Blob { dir: PathBuf, prefix: String },
    /// In-process KV list; lost on restart.
    MemoryKv { key: String },
    /// In-process object store; lost on restart.
    MemoryBlob { prefix: String },
}

impl core::fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            BackendConfig::File { path } => f.debug_struct("File").field("path", path).finish(),
            // The URL may carry a password.
            BackendConfig::Kv { key, .. } => f
                .debug_struct("Kv")
                .field("url", &"<redacted>")
                .field("key", key)
                .finish(),
            BackendConfig::Blob { dir, prefix } => f
                .debug_struct("Blob")
                .field("dir", dir)
                .field("prefix", prefix)
                .finish(),
            BackendConfig::MemoryKv { key } => f.debug_struct("MemoryKv").field("key", key).finish(),
            BackendConfig::MemoryBlob { prefix } => f.debug_struct("MemoryBlob").field("prefix", prefix).finish(),
        }
    }
}

/// Credentials and cookie settings handed to the auth layer.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthConfig {
    pub ingest_secret: Option<String>,
    pub viewer_password: Option<String>,
    pub cookie_name: String,
    /// HMAC key for session tokens; falls back to the viewer password.
    pub session_secret: Option<String>,
    pub secure_cookies: bool,
}

impl core::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("ingest_secret", &self.ingest_secret.as_ref().map(|_| "<redacted>"))
            .field("viewer_password", &self.viewer_password.as_ref().map(|_| "<redacted>"))
            .field("cookie_name", &self.cookie_name)
            .field("session_secret", &self.session_secret.as_ref().map(|_| "<redacted>"))
            .field("secure_cookies", &self.secure_cookies)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookConfig {
    pub backend: BackendConfig,
    pub limits: StoreLimits,
    pub bind: SocketAddr,
    pub auth: AuthConfig,
}

pub const DEFAULT_FILE: &str = "/tmp/events.json";
pub const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379";
pub const DEFAULT_KV_KEY: &str = "hooklog:events";
pub const DEFAULT_BLOB_DIR: &str = "/tmp/hooklog-blobs";
pub const DEFAULT_BLOB_PREFIX: &str = "events/";
pub const DEFAULT_BIND: &str = "0.0.0.0:8080";
pub const DEFAULT_COOKIE_NAME: &str = "wv_auth";

impl HookConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());
        let or = |var: &str, default: &str| get(var).unwrap_or_else(|| default.to_string());

        let backend = match or("HOOKLOG_BACKEND", "file").trim().to_ascii_lowercase().as_str() {
            "file" => BackendConfig::File {
                path: PathBuf::from(or("HOOKLOG_FILE", DEFAULT_FILE)),
            },
            "kv" | "redis" => {
                if !cfg!(feature = "redis") {
                    return Err(ConfigError::Unsupported(
                        "the kv backend needs hooklog-infra built with the `redis` feature".to_string(),
                    ));
                }
                BackendConfig::Kv {
                    url: or("REDIS_URL", DEFAULT_REDIS_URL),
                    key: or("HOOKLOG_KV_KEY", DEFAULT_KV_KEY),
                }
            }
            "blob" => BackendConfig::Blob {
                dir: PathBuf::from(or("HOOKLOG_BLOB_DIR", DEFAULT_BLOB_DIR)),
                prefix: or("HOOKLOG_BLOB_PREFIX", DEFAULT_BLOB_PREFIX),
            },
            "memory-kv" => BackendConfig::MemoryKv {
                key: or("HOOKLOG_KV_KEY", DEFAULT_KV_KEY),
            },
            "memory-blob" => BackendConfig::MemoryBlob {
                prefix: or("HOOKLOG_BLOB_PREFIX", DEFAULT_BLOB_PREFIX),
            },
            other => return Err(ConfigError::UnknownBackend(other.to_string())),
        };

        let defaults = StoreLimits::default();
        let cap = number(&get, "MAX_EVENTS", defaults.cap)?;
        if cap == 0 {
            return Err(invalid("MAX_EVENTS", "0", "must be at least 1"));
        }
        let limits = StoreLimits {
            cap,
            list_ceiling: number(&get, "HOOKLOG_LIST_CEILING", cap)?,
            max_limit: number(&get, "HOOKLOG_MAX_LIMIT", defaults.max_limit)?,
            default_limit: number(&get, "HOOKLOG_DEFAULT_LIMIT", defaults.default_limit)?,
            op_timeout: millis(&get, "HOOKLOG_OP_TIMEOUT_MS", defaults.op_timeout)?,
            fetch_timeout: millis(&get, "HOOKLOG_FETCH_TIMEOUT_MS", defaults.fetch_timeout)?,
        };

        let bind_raw = or("HOOKLOG_BIND", DEFAULT_BIND);
        let bind = bind_raw
            .parse::<SocketAddr>()
            .map_err(|e| invalid("HOOKLOG_BIND", &bind_raw, e))?;

        let auth = AuthConfig {
            ingest_secret: get("INGEST_SECRET"),
            viewer_password: get("VIEWER_PASSWORD"),
            cookie_name: or("VIEWER_COOKIE_NAME", DEFAULT_COOKIE_NAME),
            session_secret: get("HOOKLOG_SESSION_SECRET"),
            secure_cookies: get("HOOKLOG_ENV").is_some_and(|v| v.eq_ignore_ascii_case("production")),
        };

        Ok(Self {
            backend,
            limits,
            bind,
            auth,
        })
    }
}

fn invalid(var: &'static str, value: &str, reason: impl ToString) -> ConfigError {
    ConfigError::Invalid {
        var,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn number<G>(get: &G, var: &'static str, default: usize) -> Result<usize, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    match get(var) {
        Some(raw) => raw.trim().parse().map_err(|e| invalid(var, &raw, e)),
        None => Ok(default),
    }
}

fn millis<G>(get: &G, var: &'static str, default: Duration) -> Result<Duration, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    match get(var) {
        Some(raw) => {
            let ms: u64 = raw.trim().parse().map_err(|e| invalid(var, &raw, e))?;
            if ms == 0 {
                return Err(invalid(var, &raw, "must be positive"));
            }
            Ok(Duration::from_millis(ms))
        }
        None => Ok(default),
    }
}

/// Build the configured backend.
///
/// `clock` stamps uploads in the in-memory object store.
pub async fn open_backend(cfg: &BackendConfig, clock: Arc<dyn Clock>) -> Result<Arc<dyn Backend>, BackendError> {
    let backend: Arc<dyn Backend> = match cfg {
        BackendConfig::File { path } => Arc::new(FileBackend::new(path.clone(), WriteQueue::new())),
        BackendConfig::Kv { url, key } => open_redis(url, key).await?,
        BackendConfig::Blob { dir, prefix } => {
            Arc::new(BlobBackend::new(FsObjectStore::new(dir.clone()).await?, prefix.clone()))
        }
        BackendConfig::MemoryKv { key } => Arc::new(KvBackend::new(InMemoryKvClient::new(), key.clone())),
        BackendConfig::MemoryBlob { prefix } => {
            Arc::new(BlobBackend::new(InMemoryObjectStore::new(clock), prefix.clone()))
        }
    };
    info!(backend = backend.kind(), "storage backend ready");
    Ok(backend)
}

#[cfg(feature = "redis")]
async fn open_redis(url: &str, key: &str) -> Result<Arc<dyn Backend>, BackendError> {
    let client = crate::backend::RedisKvClient::connect(url).await?;
    Ok(Arc::new(KvBackend::new(client, key)))
}

#[cfg(not(feature = "redis"))]
async fn open_redis(_url: &str, _key: &str) -> Result<Arc<dyn Backend>, BackendError> {
    Err(BackendError::unavailable(
        "the kv backend needs hooklog-infra built with the `redis` feature",
    ))
}
