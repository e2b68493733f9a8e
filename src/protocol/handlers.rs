//! Request handlers for the RAX media server.
//!
//! Each handler checks the caller's permission, confines every path it was
//! given through the shared `PathResolver`, then delegates to the storage or
//! transfer layer. Errors are rendered by `MediaServerError`'s response impl.

use axum::Json;
use axum::extract::multipart::MultipartError;
use axum::extract::{Extension, Multipart, Query, State};
use axum::http::{HeaderMap, header};
use axum::response::{IntoResponse, Response};
use axum_extra::extract::CookieJar;
use axum_extra::extract::cookie::{Cookie, SameSite};
use cookie::time::Duration as CookieDuration;
use log::{debug, info, warn};
use std::path::Path;
use std::sync::Arc;

use crate::auth::{SESSION_COOKIE, Session, validate_login};
use crate::error::handlers::plain_text_response;
use crate::error::{AuthError, MediaServerError, PathError, StorageError};
use crate::middleware::authorize;
use crate::protocol::commands::{
    DeleteRequest, LoginRequest, MkdirRequest, PathQuery, RenameRequest, UPLOAD_FILE_FIELD,
    UPLOAD_PATH_FIELD,
};
use crate::protocol::responses::{
    ListResponse, LoginResponse, SessionResponse, SuccessResponse, UploadResponse,
};
use crate::server::AppState;
use crate::storage::{
    Operation, ResolvedPath, StagedUpload, UploadedFile, create_directory, delete_entry,
    ensure_directory, list_directory, rename_entry, validate_name,
};
use crate::transfer::MediaKind;

type ApiResult<T> = Result<T, MediaServerError>;

/// Handles `POST /api/login`: verifies credentials and issues the session cookie.
///
/// Failed attempts are counted per username; once the limit is reached the
/// username is locked out for the configured window, even for correct
/// passwords.
pub async fn handle_login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(request): Json<LoginRequest>,
) -> ApiResult<(CookieJar, Json<LoginResponse>)> {
    let level = {
        let mut limiter = state.login_limiter.lock().await;
        if !limiter.is_allowed(&request.username) {
            return Err(AuthError::TooManyAttempts(request.username).into());
        }

        match validate_login(
            state.credentials.as_ref(),
            &request.username,
            &request.password,
        ) {
            Ok(level) => {
                limiter.clear(&request.username);
                level
            }
            Err(e) => {
                limiter.record(&request.username);
                return Err(e.into());
            }
        }
    };

    let session = state.sessions.create(&request.username, level);
    let max_age = i64::try_from(state.startup.session_ttl_secs).unwrap_or(i64::MAX);
    let cookie = Cookie::build((SESSION_COOKIE, session.id))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Strict)
        .max_age(CookieDuration::seconds(max_age))
        .build();

    info!("User {} logged in as {:?}", request.username, level);
    Ok((
        jar.add(cookie),
        Json(LoginResponse {
            success: true,
            username: request.username,
            level,
        }),
    ))
}

/// Handles `POST /api/logout`: ends the session (if any) and clears the cookie.
pub async fn handle_logout(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> (CookieJar, Json<SuccessResponse>) {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        state.sessions.remove(cookie.value());
    }
    let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/").build());
    (jar, Json(SuccessResponse::ok()))
}

/// Handles `GET /api/session`
pub async fn handle_session(Extension(session): Extension<Session>) -> Json<SessionResponse> {
    Json(SessionResponse {
        username: session.username,
        level: session.level,
    })
}

/// Handles `GET /api/list?path=`. The root is listed when `path` is absent.
pub async fn handle_list(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
    Query(query): Query<PathQuery>,
) -> ApiResult<Json<ListResponse>> {
    authorize(&session, Operation::List)?;

    let dir = state.resolver.resolve(query.path.as_deref().unwrap_or("/"))?;
    let files = list_directory(&dir).await?;
    Ok(Json(ListResponse { files }))
}

/// Handles `GET /media?path=` with optional `Range` support.
///
/// Errors are plain text, as the response body may be consumed directly by
/// `<img>`/`<video>` elements.
pub async fn handle_media(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
    Query(query): Query<PathQuery>,
    headers: HeaderMap,
) -> Response {
    match serve_media(&state, &session, query, &headers).await {
        Ok(response) => response,
        Err(e) => plain_text_response(e),
    }
}

async fn serve_media(
    state: &AppState,
    session: &Session,
    query: PathQuery,
    headers: &HeaderMap,
) -> ApiResult<Response> {
    authorize(session, Operation::ViewMedia)?;

    let requested = query
        .path
        .filter(|p| !p.is_empty())
        .ok_or(PathError::MissingPath)?;
    let file = state.resolver.resolve(&requested)?;

    let range = match headers.get(header::RANGE) {
        Some(value) => match value.to_str() {
            Ok(text) => Some(text),
            Err(_) => {
                debug!("Non-ASCII Range header ignored for {}", file.client_path());
                None
            }
        },
        None => None,
    };

    let response = state.streamer.stream(&file, range).await?;
    Ok(response.into_response())
}

/// Handles `POST /api/upload` (multipart).
///
/// The optional `path` field selects the target directory and must come
/// before any `mediaFiles` part. Files with unsupported extensions are
/// skipped. Each accepted file is staged and renamed into place.
pub async fn handle_upload(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
    mut multipart: Multipart,
) -> ApiResult<Json<UploadResponse>> {
    authorize(&session, Operation::Upload)?;

    let (limit_bytes, max_files) = {
        let runtime = state.runtime.read().await;
        (runtime.max_file_size_bytes(), runtime.max_upload_files)
    };

    let mut target_dir: Option<ResolvedPath> = None;
    let mut files_seen = 0usize;
    let mut uploaded = Vec::new();

    while let Some(mut field) = multipart.next_field().await.map_err(malformed_upload)? {
        let field_name = field.name().unwrap_or_default().to_string();

        match field_name.as_str() {
            UPLOAD_PATH_FIELD => {
                if files_seen > 0 {
                    return Err(StorageError::MalformedUpload(
                        "path field must precede files".into(),
                    )
                    .into());
                }
                let requested = field.text().await.map_err(malformed_upload)?;
                let dir = state.resolver.resolve(&requested)?;
                ensure_directory(&dir).await?;
                target_dir = Some(dir);
            }
            UPLOAD_FILE_FIELD => {
                files_seen += 1;
                if files_seen > max_files {
                    return Err(StorageError::TooManyFiles { limit: max_files }.into());
                }

                let original = field.file_name().unwrap_or_default().to_string();
                let name = validate_name(&original)?.to_string();
                if MediaKind::from_path(Path::new(&name)).is_none() {
                    info!("Skipping unsupported upload {:?}", name);
                    continue;
                }

                let dir = match &target_dir {
                    Some(dir) => dir.clone(),
                    None => {
                        let root = state.resolver.resolve("")?;
                        target_dir = Some(root.clone());
                        root
                    }
                };
                let destination = state.resolver.resolve_child(&dir, &name)?;

                let mut staged = StagedUpload::create(destination, limit_bytes).await?;
                while let Some(chunk) = field.chunk().await.map_err(malformed_upload)? {
                    staged.write_chunk(&chunk).await?;
                }
                let stored = staged.commit().await?;

                uploaded.push(UploadedFile {
                    name,
                    path: stored.client_path(),
                });
            }
            other => debug!("Ignoring multipart field {:?}", other),
        }
    }

    if uploaded.is_empty() {
        return Err(StorageError::NoFilesReceived.into());
    }

    info!(
        "User {} uploaded {} file(s)",
        session.username,
        uploaded.len()
    );
    Ok(Json(UploadResponse {
        success: true,
        uploaded,
    }))
}

/// Handles `DELETE /api/delete {path}`
pub async fn handle_delete(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
    Json(request): Json<DeleteRequest>,
) -> ApiResult<Json<SuccessResponse>> {
    authorize(&session, Operation::Delete)?;

    let requested = required(request.path)?;
    let target = state.resolver.resolve(&requested)?;
    delete_entry(&target).await?;

    info!("User {} deleted {}", session.username, target.client_path());
    Ok(Json(SuccessResponse::ok()))
}

/// Handles `POST /api/mkdir {path, name}`
pub async fn handle_mkdir(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
    Json(request): Json<MkdirRequest>,
) -> ApiResult<Json<SuccessResponse>> {
    authorize(&session, Operation::CreateDirectory)?;

    let name = request
        .name
        .ok_or_else(|| PathError::InvalidName(String::new()))?;
    let parent = state
        .resolver
        .resolve(request.path.as_deref().unwrap_or("/"))?;
    let target = state.resolver.resolve_child(&parent, &name)?;
    create_directory(&target).await?;

    Ok(Json(SuccessResponse::ok()))
}

/// Handles `POST /api/rename {path, newName}`. The entry stays in its
/// directory; only its last component changes.
pub async fn handle_rename(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
    Json(request): Json<RenameRequest>,
) -> ApiResult<Json<SuccessResponse>> {
    if !state.startup.enable_rename {
        return Err(StorageError::FeatureDisabled("rename").into());
    }
    authorize(&session, Operation::Rename)?;

    let requested = required(request.path)?;
    let new_name = request
        .new_name
        .ok_or_else(|| PathError::InvalidName(String::new()))?;

    let source = state.resolver.resolve(&requested)?;
    if source.is_root() {
        warn!("User {} tried to rename the media root", session.username);
        return Err(StorageError::RootProtected.into());
    }
    let parent = match source.as_path().parent() {
        Some(parent) => state.resolver.resolve_absolute(parent)?,
        None => return Err(StorageError::RootProtected.into()),
    };
    let destination = state.resolver.resolve_child(&parent, &new_name)?;
    rename_entry(&source, &destination).await?;

    Ok(Json(SuccessResponse::ok()))
}

fn required(path: Option<String>) -> Result<String, PathError> {
    path.filter(|p| !p.is_empty()).ok_or(PathError::MissingPath)
}

fn malformed_upload(e: MultipartError) -> MediaServerError {
    StorageError::MalformedUpload(e.body_text()).into()
}
