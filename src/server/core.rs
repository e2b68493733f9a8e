use log::{debug, error, info};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

use crate::config::ServerConfig;
use crate::protocol::router;
use crate::server::state::AppState;

const SESSION_PRUNE_INTERVAL: Duration = Duration::from_secs(60);

pub struct Server {
    listener: TcpListener,
    state: Arc<AppState>,
}

impl Server {
    /// Prepare the media root and bind the HTTP listener.
    pub async fn new(config: ServerConfig) -> std::io::Result<Self> {
        let state = Arc::new(AppState::from_config(config)?);
        Self::with_state(state).await
    }

    /// Bind the listener for already-built state.
    pub async fn with_state(state: Arc<AppState>) -> std::io::Result<Self> {
        let socket = state.startup.listen_socket();
        let listener = match TcpListener::bind(&socket).await {
            Ok(listener) => {
                info!("Server bound to {}", socket);
                listener
            }
            Err(e) => {
                error!("Failed to bind to {}: {}", socket, e);
                return Err(e);
            }
        };

        Ok(Self { listener, state })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Serve requests until Ctrl-C. Each request runs on its own task.
    pub async fn start(self) -> std::io::Result<()> {
        info!(
            "Starting RAX media server on {} (rename {})",
            self.local_addr()?,
            if self.state.startup.enable_rename {
                "enabled"
            } else {
                "disabled"
            }
        );

        spawn_session_pruning(Arc::clone(&self.state));

        axum::serve(self.listener, router(self.state))
            .with_graceful_shutdown(shutdown_signal())
            .await
    }
}

/// Periodically drops expired login sessions and failed-login windows
fn spawn_session_pruning(state: Arc<AppState>) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(SESSION_PRUNE_INTERVAL);
        loop {
            ticker.tick().await;
            let removed = state.sessions.prune_expired();
            if removed > 0 {
                info!("Pruned {} expired sessions", removed);
            }
            let forgotten = state.login_limiter.lock().await.prune_expired();
            if forgotten > 0 {
                debug!("Forgot {} idle login throttles", forgotten);
            }
        }
    });
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received, stopping server"),
        Err(e) => error!("Failed to listen for shutdown signal: {}", e),
    }
}
