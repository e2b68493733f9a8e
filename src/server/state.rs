//! Shared application state
//!
//! Everything a request handler needs, built once at startup and shared
//! read-only behind an `Arc`.

use log::info;
use std::io;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::auth::{ConfigCredentialStore, CredentialStore, InMemorySessionStore, SessionStore};
use crate::config::{ServerConfig, SharedRuntimeConfig, StartupConfig};
use crate::middleware::RateLimiter;
use crate::storage::PathResolver;
use crate::transfer::RangeStreamer;

pub struct AppState {
    pub resolver: PathResolver,
    pub streamer: RangeStreamer,
    pub startup: StartupConfig,
    pub runtime: SharedRuntimeConfig,
    pub sessions: Arc<dyn SessionStore>,
    pub credentials: Arc<dyn CredentialStore>,
    pub login_limiter: Mutex<RateLimiter>,
}

impl AppState {
    /// Build state from configuration with the default in-memory session
    /// store and config-file credentials. Creates the media root if missing.
    pub fn from_config(config: ServerConfig) -> io::Result<Self> {
        let (startup, runtime) = config.split();
        let sessions = Arc::new(InMemorySessionStore::new(startup.session_ttl()));
        info!("Loaded {} user account(s)", startup.users.len());
        let credentials = Arc::new(ConfigCredentialStore::new(&startup.users));
        Self::with_stores(startup, runtime, sessions, credentials)
    }

    /// Build state around caller-supplied session and credential stores.
    pub fn with_stores(
        startup: StartupConfig,
        runtime: SharedRuntimeConfig,
        sessions: Arc<dyn SessionStore>,
        credentials: Arc<dyn CredentialStore>,
    ) -> io::Result<Self> {
        let root = startup.media_root_path();
        std::fs::create_dir_all(&root)?;
        let resolver = PathResolver::new(&root, startup.confine_symlinks)?;
        info!("Media root directory: {}", resolver.root().display());

        let streamer = RangeStreamer::new(startup.mime_policy, startup.stream_buffer_size);
        let login_limiter = Mutex::new(RateLimiter::new(
            startup.login_max_attempts,
            startup.login_window(),
        ));

        Ok(Self {
            resolver,
            streamer,
            startup,
            runtime,
            sessions,
            credentials,
            login_limiter,
        })
    }
}
