//! HTTP protocol implementation
//!
//! Request/response shapes, route handlers and the router tying them to the
//! session guard.

pub mod commands;
pub mod handlers;
pub mod responses;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::{delete, get, post};
use log::info;
use std::sync::Arc;
use tower_http::services::ServeDir;

use crate::middleware::{log_request, require_session};
use crate::server::AppState;
use handlers::{
    handle_delete, handle_list, handle_login, handle_logout, handle_media, handle_mkdir,
    handle_rename, handle_session, handle_upload,
};

/// Build the application router.
///
/// Everything except login/logout sits behind the session guard. Uploads
/// bypass the default body limit; they are bounded per file instead.
pub fn router(state: Arc<AppState>) -> Router {
    let protected = Router::new()
        .route("/api/list", get(handle_list))
        .route("/media", get(handle_media))
        .route(
            "/api/upload",
            post(handle_upload).layer(DefaultBodyLimit::disable()),
        )
        .route("/api/delete", delete(handle_delete))
        .route("/api/mkdir", post(handle_mkdir))
        .route("/api/rename", post(handle_rename))
        .route("/api/session", get(handle_session))
        .route_layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            require_session,
        ));

    let public = Router::new()
        .route("/api/login", post(handle_login))
        .route("/api/logout", post(handle_logout));

    let mut app = Router::new().merge(protected).merge(public);
    if let Some(dir) = &state.startup.static_dir {
        info!("Serving static files from {}", dir);
        app = app.fallback_service(ServeDir::new(dir));
    }

    app.layer(middleware::from_fn(log_request)).with_state(state)
}
