//! Session middleware
//!
//! Rejects requests without a live session cookie and exposes the session to
//! handlers as a request extension.

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum_extra::extract::CookieJar;
use log::warn;
use std::sync::Arc;

use crate::auth::{SESSION_COOKIE, Session};
use crate::error::{AuthError, MediaServerError};
use crate::server::AppState;
use crate::storage::Operation;

/// Require a valid session for everything behind this layer.
pub async fn require_session(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let session = jar
        .get(SESSION_COOKIE)
        .and_then(|cookie| state.sessions.get(cookie.value()));

    match session {
        Some(session) => {
            request.extensions_mut().insert(session);
            next.run(request).await
        }
        None => {
            warn!("Unauthenticated request to {}", request.uri().path());
            MediaServerError::from(AuthError::NotLoggedIn).into_response()
        }
    }
}

/// Check that `session` may perform `operation`.
pub fn authorize(session: &Session, operation: Operation) -> Result<(), MediaServerError> {
    if session.level.allows(operation) {
        Ok(())
    } else {
        warn!(
            "User {} ({:?}) denied {:?}",
            session.username, session.level, operation
        );
        Err(AuthError::InsufficientPermission.into())
    }
}
