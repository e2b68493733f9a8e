//! Error handlers
//!
//! Maps domain errors onto HTTP statuses and generic client messages.
//! Nothing produced here ever contains a filesystem path.

use axum::Json;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use log::{error, warn};
use serde_json::json;
use std::io::ErrorKind;

use crate::error::types::{AuthError, MediaServerError, PathError, StorageError, StreamError};

/// Log a media server error at a level matching its severity
pub fn handle_error(err: &MediaServerError) {
    match error_to_status(err) {
        status if status.is_server_error() => error!("Media Server Error: {}", err),
        _ => warn!("Request rejected: {}", err),
    }
}

fn io_status(e: &std::io::Error) -> StatusCode {
    match e.kind() {
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Convert error to HTTP status code
pub fn error_to_status(err: &MediaServerError) -> StatusCode {
    match err {
        MediaServerError::Path(PathError::Forbidden) => StatusCode::FORBIDDEN,
        MediaServerError::Path(_) => StatusCode::BAD_REQUEST,
        MediaServerError::Stream(StreamError::NotFound) => StatusCode::NOT_FOUND,
        MediaServerError::Stream(StreamError::RangeNotSatisfiable { .. }) => {
            StatusCode::RANGE_NOT_SATISFIABLE
        }
        MediaServerError::Stream(StreamError::InternalIo(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        MediaServerError::Storage(e) => match e {
            StorageError::NotFound(_) | StorageError::FeatureDisabled(_) => StatusCode::NOT_FOUND,
            StorageError::NotADirectory(_)
            | StorageError::NoFilesReceived
            | StorageError::TooManyFiles { .. }
            | StorageError::MalformedUpload(_) => StatusCode::BAD_REQUEST,
            StorageError::AlreadyExists(_) => StatusCode::CONFLICT,
            StorageError::RootProtected => StatusCode::FORBIDDEN,
            StorageError::FileTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            StorageError::IoError(e) => io_status(e),
        },
        MediaServerError::Auth(e) => match e {
            AuthError::InvalidCredentials(_) | AuthError::NotLoggedIn => StatusCode::UNAUTHORIZED,
            AuthError::MalformedInput(_) => StatusCode::BAD_REQUEST,
            AuthError::InsufficientPermission => StatusCode::FORBIDDEN,
            AuthError::TooManyAttempts(_) => StatusCode::TOO_MANY_REQUESTS,
        },
    }
}

/// Generic, path-free message shown to the client
pub fn client_message(err: &MediaServerError) -> &'static str {
    match err {
        MediaServerError::Path(PathError::Forbidden) => "Forbidden",
        MediaServerError::Path(PathError::MissingPath) => "Missing path",
        MediaServerError::Path(PathError::InvalidName(_)) => "Invalid name",
        MediaServerError::Stream(StreamError::NotFound) => "Not found",
        MediaServerError::Stream(StreamError::RangeNotSatisfiable { .. }) => {
            "Range not satisfiable"
        }
        MediaServerError::Storage(e) => match e {
            StorageError::NotFound(_) => "Not found",
            StorageError::NotADirectory(_) => "Not a directory",
            StorageError::AlreadyExists(_) => "Target already exists",
            StorageError::RootProtected => "Forbidden",
            StorageError::NoFilesReceived => "No files received",
            StorageError::FileTooLarge { .. } => "File too large",
            StorageError::TooManyFiles { .. } => "Too many files",
            StorageError::MalformedUpload(_) => "Malformed upload",
            StorageError::FeatureDisabled(_) => "Not found",
            StorageError::IoError(e) if e.kind() == ErrorKind::NotFound => "Not found",
            StorageError::IoError(_) => "Internal server error",
        },
        MediaServerError::Auth(e) => match e {
            AuthError::InvalidCredentials(_) => "Invalid username or password",
            AuthError::MalformedInput(_) => "Malformed credentials",
            AuthError::NotLoggedIn => "Unauthorized",
            AuthError::InsufficientPermission => "Insufficient permissions",
            AuthError::TooManyAttempts(_) => "Too many login attempts",
        },
        MediaServerError::Stream(StreamError::InternalIo(_)) => "Internal server error",
    }
}

fn content_range_unsatisfied(err: &MediaServerError) -> Option<HeaderValue> {
    match err {
        MediaServerError::Stream(StreamError::RangeNotSatisfiable { size }) => {
            HeaderValue::from_str(&format!("bytes */{}", size)).ok()
        }
        _ => None,
    }
}

/// Plain-text rendition used by the `/media` route
pub fn plain_text_response(err: MediaServerError) -> Response {
    handle_error(&err);
    let status = error_to_status(&err);
    let mut response = (status, client_message(&err)).into_response();
    if let Some(value) = content_range_unsatisfied(&err) {
        response.headers_mut().insert(header::CONTENT_RANGE, value);
    }
    response
}

impl IntoResponse for MediaServerError {
    fn into_response(self) -> Response {
        handle_error(&self);
        let status = error_to_status(&self);
        let body = Json(json!({ "error": client_message(&self) }));
        let mut response = (status, body).into_response();
        if let Some(value) = content_range_unsatisfied(&self) {
            response.headers_mut().insert(header::CONTENT_RANGE, value);
        }
        response
    }
}
