//! Module `commands`
//!
//! Request shapes accepted by the HTTP API. Every path they carry is
//! untrusted and goes through `PathResolver` before use.

use serde::Deserialize;

/// Multipart field naming the upload target directory
pub const UPLOAD_PATH_FIELD: &str = "path";

/// Multipart field carrying one uploaded media file
pub const UPLOAD_FILE_FIELD: &str = "mediaFiles";

/// `?path=` query of `/api/list` and `/media`
#[derive(Debug, Default, Deserialize)]
pub struct PathQuery {
    pub path: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct DeleteRequest {
    pub path: Option<String>,
}

/// Create folder `name` inside `path` (root when absent)
#[derive(Debug, Deserialize)]
pub struct MkdirRequest {
    #[serde(default)]
    pub path: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RenameRequest {
    pub path: Option<String>,
    #[serde(rename = "newName")]
    pub new_name: Option<String>,
}
